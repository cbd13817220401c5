#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gateway::core::env::app_env::{AppEnv, TlsConfig, UpstreamConfig};
use parking_lot::Mutex;
use salvo::prelude::*;
use serde_json::json;

pub const GATEWAY: &str = "http://127.0.0.1:5800";

pub fn test_env(upstream_url: &str) -> AppEnv {
    AppEnv {
        app_port: 0,
        mount_path: "api".to_string(),
        upstream: UpstreamConfig {
            base_url: upstream_url.to_string(),
            timeout_secs: 2,
            forward_headers: AppEnv::parse_header_list("accept"),
            max_body_bytes: 64 * 1024,
        },
        tls_enabled: false,
        tls: TlsConfig {
            cert_path: "unused.pem".to_string(),
            key_path: "unused.pem".to_string(),
        },
    }
}

/// Serves `service` on a free local port and returns its base URL.
pub async fn spawn_server(service: impl Into<Service>) -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let addr = format!("127.0.0.1:{port}");

    let acceptor = TcpListener::new(addr.clone()).bind().await;
    let service = service.into();
    tokio::spawn(async move {
        Server::new(acceptor).serve(service).await;
    });

    format!("http://{addr}")
}

/// A request as the echo upstream saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub content_length: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct EchoState {
    received: Mutex<Vec<Received>>,
}

impl EchoState {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    pub fn last(&self) -> Option<Received> {
        self.received.lock().last().cloned()
    }
}

pub struct EchoUpstream {
    pub url: String,
    pub state: Arc<EchoState>,
}

/// Upstream that answers every request with a JSON description of what it received.
pub async fn spawn_echo_upstream() -> String {
    spawn_recording_upstream().await.url
}

/// Same as [`spawn_echo_upstream`], also keeping every echoed request for inspection.
pub async fn spawn_recording_upstream() -> EchoUpstream {
    let state = Arc::new(EchoState::default());
    let router = Router::new()
        .hoop(affix_state::inject(state.clone()))
        .push(Router::with_path("status/{code}").goal(fixed_status))
        .push(Router::with_path("slow").goal(slow))
        .push(Router::with_path("tokens/missing").delete(token_not_found))
        .push(Router::with_path("tokens/{id}").delete(no_content))
        .goal(echo)
        .push(Router::with_path("{**rest}").goal(echo));

    EchoUpstream {
        url: spawn_server(router).await,
        state,
    }
}

/// Address nothing listens on.
pub fn dead_upstream() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{port}")
}

#[handler]
async fn echo(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let raw = req.payload().await.map(|bytes| bytes.to_vec()).unwrap_or_default();
    let body = String::from_utf8_lossy(&raw).to_string();

    if let Ok(state) = depot.obtain::<Arc<EchoState>>() {
        state.received.lock().push(Received {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            content_length: req
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: raw,
        });
    }

    let headers: BTreeMap<String, String> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    res.render(Json(json!({
        "method": req.method().as_str(),
        "path": req.uri().path(),
        "query": req.uri().query(),
        "headers": headers,
        "body": body,
    })));
}

#[handler]
async fn fixed_status(req: &mut Request, res: &mut Response) {
    let code: u16 = req.param("code").unwrap_or(500);
    res.status_code(StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    res.headers_mut()
        .insert("x-upstream-only", "1".parse().unwrap());
    res.render(Text::Plain(format!("status {code}")));
}

#[handler]
async fn slow(res: &mut Response) {
    tokio::time::sleep(Duration::from_secs(5)).await;
    res.render("too late");
}

#[handler]
async fn token_not_found(res: &mut Response) {
    res.status_code(StatusCode::NOT_FOUND);
    res.render(Json(json!({ "error": "Token not found" })));
}

#[handler]
async fn no_content(res: &mut Response) {
    res.status_code(StatusCode::NO_CONTENT);
}
