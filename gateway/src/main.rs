use anyhow::Context;
use gateway::core::{api::salvo_config::get_salvo_service, env::app_env::AppEnv};
use salvo::{
    conn::{
        Acceptor,
        rustls::{Keycert, RustlsConfig},
    },
    prelude::*,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env = AppEnv::new();
    let http_addr = format!("0.0.0.0:{}", env.app_port);
    let service = get_salvo_service(&env)?;

    if env.tls_enabled {
        run_tls_server(&env, http_addr, service).await?;
    } else {
        run_plain_server(&http_addr, service).await;
    }

    Ok(())
}

async fn run_tls_server(env: &AppEnv, http_addr: String, service: Service) -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cert = std::fs::read(&env.tls.cert_path)
        .with_context(|| format!("Failed to read TLS certificate {}", env.tls.cert_path))?;
    let key = std::fs::read(&env.tls.key_path)
        .with_context(|| format!("Failed to read TLS key {}", env.tls.key_path))?;
    let config = RustlsConfig::new(Keycert::new().cert(cert.as_slice()).key(key.as_slice()));

    tracing::info!("Gateway listening on https://{}", http_addr);
    let acceptor = TcpListener::new(http_addr).rustls(config).bind().await;
    run_server(Server::new(acceptor), service).await;

    Ok(())
}

async fn run_plain_server(http_addr: &str, service: Service) {
    tracing::info!("Gateway listening on http://{}", http_addr);
    let acceptor = TcpListener::new(http_addr).bind().await;
    run_server(Server::new(acceptor), service).await;
}

async fn run_server<A: Acceptor + Send>(server: Server<A>, service: Service) {
    let handle = server.handle();

    // Graceful shutdown handler
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for ctrl_c");
            return;
        }
        tracing::info!("Signal received, shutting down gracefully...");
        handle.stop_graceful(None);
    });

    server.serve(service).await;
}
