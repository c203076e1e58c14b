use crate::config::ServerConfig;
use crate::signaling::{SignalingRelay, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

pub fn router(relay: SignalingRelay, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/health", get(health))
        .with_state(relay)
}

async fn health(State(relay): State<SignalingRelay>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        connections: relay.connection_count(),
        rooms: relay.room_count(),
    })
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve_on(listener, SignalingRelay::new(), &config.ws_path).await
}

pub async fn serve_on(listener: TcpListener, relay: SignalingRelay, ws_path: &str) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    info!("Signaling relay listening on ws://{}{}", addr, ws_path);

    axum::serve(listener, router(relay, ws_path))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Signaling server crashed")?;

    info!("Signaling relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
