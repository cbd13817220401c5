use std::time::Duration;

use bytes::Bytes;
use salvo::async_trait;
use salvo::http::header::CONTENT_TYPE;
use salvo::http::{HeaderMap, HeaderValue, Method, StatusCode};
use salvo::prelude::*;

use crate::core::env::app_env::AppEnv;
use crate::core::types::errors::gateway_error::GatewayError;

/// Inbound request as seen by the gateway, already detached from the transport.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// The parts of an upstream response relayed back to the caller.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[async_trait]
impl Writer for ProxyResponse {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        res.status_code(self.status);
        if let Some(content_type) = self.content_type {
            res.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        if let Err(err) = res.write_body(self.body) {
            tracing::error!(error = %err, "Failed to write proxied response body");
        }
    }
}

#[async_trait]
pub trait ProxyService: Send + Sync {
    fn target_url(&self, path: &str, query: Option<&str>) -> String;

    async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct ProxyServiceImpl {
    http: reqwest::Client,
    base_url: String,
    mount_path: String,
    forward_headers: Vec<String>,
    max_body_bytes: usize,
}

impl ProxyServiceImpl {
    pub fn new(env: &AppEnv) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(env.upstream.timeout_secs))
            .build()
            .map_err(|err| GatewayError::Misconfigured(err.to_string()))?;

        Ok(Self {
            http,
            base_url: env.upstream.base_url.clone(),
            mount_path: env.mount_path.clone(),
            forward_headers: env.upstream.forward_headers.clone(),
            max_body_bytes: env.upstream.max_body_bytes,
        })
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    fn is_forwarded(&self, name: &str) -> bool {
        self.forward_headers.iter().any(|h| h == name)
    }
}

#[async_trait]
impl ProxyService for ProxyServiceImpl {
    fn target_url(&self, path: &str, query: Option<&str>) -> String {
        build_target_url(&self.base_url, &self.mount_path, path, query)
    }

    async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, GatewayError> {
        let target = self.target_url(&request.path, request.query.as_deref());

        let mut outbound = self.http.request(request.method.clone(), &target);

        // Header names in a HeaderMap are already lower-case.
        for (name, value) in request.headers.iter() {
            if self.is_forwarded(name.as_str()) {
                outbound = outbound.header(name, value);
            }
        }

        if let Some(body) = request.body {
            if allows_body(&request.method) {
                outbound = outbound.body(body);
            }
        }

        tracing::debug!(method = %request.method, target = %target, "Forwarding request");

        let response = outbound.send().await.map_err(|err| {
            tracing::error!(
                error = %err,
                method = %request.method,
                target = %target,
                "Failed to reach upstream API"
            );
            GatewayError::from(err)
        })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();

        let body = response.bytes().await.map_err(|err| {
            tracing::error!(
                error = %err,
                method = %request.method,
                target = %target,
                "Failed to read upstream response"
            );
            GatewayError::UpstreamBody(err.to_string())
        })?;

        Ok(ProxyResponse {
            status,
            content_type,
            body,
        })
    }
}

/// GET and HEAD never carry a body upstream.
pub fn allows_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Maps `/<mount>/<rest>` onto `<base>/<rest>` and appends the raw query.
pub fn build_target_url(base: &str, mount: &str, path: &str, query: Option<&str>) -> String {
    let mount = format!("/{}", mount.trim_matches('/'));

    let rest = match path.strip_prefix(mount.as_str()) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };

    let mut target = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        rest.trim_start_matches('/')
    );

    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }

    target
}
