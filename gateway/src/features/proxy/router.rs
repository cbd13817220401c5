use salvo::prelude::*;

use crate::core::types::errors::gateway_error::GatewayError;

use super::service::{ProxyRequest, ProxyResponse, ProxyService, ProxyServiceImpl, allows_body};

/// Depot key marking a response that came from the upstream, so the catcher
/// leaves its status and body untouched.
pub const PROXIED_KEY: &str = "proxied";

pub fn get_proxy_router(mount_path: &str) -> Router {
    let rest_route = with_proxy_methods(Router::with_path("{**rest}"));

    with_proxy_methods(Router::with_path(mount_path.trim_matches('/'))).push(rest_route)
}

fn with_proxy_methods(router: Router) -> Router {
    router
        .get(forward)
        .head(forward)
        .post(forward)
        .put(forward)
        .patch(forward)
        .delete(forward)
}

/// Forward any request under the mount to the upstream API
#[handler]
async fn forward(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<ProxyResponse, GatewayError> {
    let proxy_service = depot
        .obtain::<ProxyServiceImpl>()
        .map_err(|_| GatewayError::Misconfigured("proxy service is not injected".to_string()))?
        .clone();

    let method = req.method().clone();

    let body = if allows_body(&method) {
        let payload = req
            .payload_with_max_size(proxy_service.max_body_bytes())
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, method = %method, "Rejected inbound request body");
                GatewayError::InvalidRequestBody(err.to_string())
            })?;
        Some(payload.clone())
    } else {
        None
    };

    let request = ProxyRequest {
        method,
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
        headers: req.headers().clone(),
        body,
    };

    let response = proxy_service.forward(request).await?;
    depot.insert(PROXIED_KEY, true);

    Ok(response)
}
