//! Axum HTTP server — JSON API under `/api/`, encoded videos under
//! `/videos/`.
//!
//! `serve()` drives the axum event loop; a [`CancellationToken`] is wired to
//! axum's graceful shutdown so ctrl-c drains in-flight renders.

mod api;
mod files;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::wms::WmsClient;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration.
    pub config: Arc<Config>,
    /// WMS client for the linear time-lapse layer.
    pub client: WmsClient,
    /// WMS client for the neural animation layer.
    pub neural_client: WmsClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = WmsClient::new(
            config.wms.url.clone(),
            config.wms.layer.clone(),
            config.wms.timeout_seconds,
        )?;
        let neural_client = WmsClient::new(
            config.wms.url.clone(),
            config.wms.neural_layer.clone(),
            config.wms.timeout_seconds,
        )?;
        Ok(Self { config: Arc::new(config), client, neural_client })
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(config: Config, shutdown: CancellationToken) -> Result<(), AppError> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config)?;
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "skylapse listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("server shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/timelapse", post(api::timelapse))
        .route("/api/timelapse/daily", post(api::daily))
        .route("/api/timelapse/range", post(api::range))
        .route("/api/timelapse/neural", post(api::neural))
        .route("/videos/{filename}", get(files::serve_video))
        .with_state(state)
}
