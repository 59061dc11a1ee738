//! Warden Server: application entry point.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use warden_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info")),
        )
        .json()
        .init();

    tracing::info!("Starting Warden server...");

    let config = ServerConfig::from_env().context("invalid configuration")?;
    let state = AppState::new(&config).context("invalid configuration")?;
    if let Err(e) = state.console().await {
        tracing::warn!(error = %e, "Storage not ready; will retry on first request");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Warden HTTP listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    tracing::info!("Warden server stopped.");
    Ok(())
}
