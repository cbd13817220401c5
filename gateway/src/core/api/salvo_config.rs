use salvo::{catcher::Catcher, prelude::*};

use crate::{
    core::{
        env::app_env::AppEnv,
        types::{errors::gateway_error::GatewayError, responses::failed_response::FailedResponse},
    },
    features::{
        health::router::get_health_router,
        proxy::{
            router::{PROXIED_KEY, get_proxy_router},
            service::ProxyServiceImpl,
        },
    },
};

pub fn get_salvo_service(env: &AppEnv) -> Result<Service, GatewayError> {
    let proxy_service = ProxyServiceImpl::new(env)?;

    tracing::info!(
        mount = %env.mount_path,
        upstream = %env.upstream.base_url,
        timeout_secs = env.upstream.timeout_secs,
        forward_headers = ?env.upstream.forward_headers,
        "Configured upstream gateway"
    );

    let router = Router::new()
        .hoop(Logger::new())
        .hoop(affix_state::inject(env.clone()))
        .hoop(affix_state::inject(proxy_service))
        .hoop(CatchPanic::new())
        .push(get_health_router())
        .push(get_proxy_router(&env.mount_path));

    Ok(Service::new(router).catcher(Catcher::default().hoop(handle_error)))
}

#[handler]
async fn handle_error(depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    // Upstream statuses and bodies are relayed as they are.
    if depot.contains_key(PROXIED_KEY) {
        ctrl.skip_rest();
        return;
    }

    match res.status_code.unwrap_or(StatusCode::NOT_FOUND) {
        StatusCode::NOT_FOUND => {
            res.render(Json(FailedResponse::new("Not found")));
            ctrl.skip_rest();
        }
        StatusCode::METHOD_NOT_ALLOWED => {
            res.render(Json(FailedResponse::new("Method not allowed")));
            ctrl.skip_rest();
        }
        _ => {}
    }
}
