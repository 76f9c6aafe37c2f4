//! HTTP gateway in front of the dialogue manager.
//!
//! Routes:
//! - `POST /predict_intent` runs one turn
//! - `POST /sessions/{id}/reset` drops a session
//! - `GET /sessions/{id}/transcript` lists a session's transcript
//! - `GET /health` and `GET /metrics` for operators

pub mod api;

use crate::config::GatewayConfig;
use crate::dialogue::DialogueManager;
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DialogueManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(manager: Arc<DialogueManager>) -> Self {
        Self {
            manager,
            started_at: Instant::now(),
        }
    }
}

/// Build the router with body-size and request-time limits applied.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/predict_intent", post(api::handle_predict_intent))
        .route("/sessions/{id}/reset", post(api::handle_reset_session))
        .route("/sessions/{id}/transcript", get(api::handle_transcript))
        .route("/health", get(api::handle_health))
        .route("/metrics", get(api::handle_metrics))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn run_gateway(manager: Arc<DialogueManager>, config: &GatewayConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway to {addr}"))?;
    let local_addr = listener.local_addr()?;

    let app = build_router(AppState::new(manager), config);

    tracing::info!(%local_addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!(%error, "failed to listen for shutdown signal");
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .context("Gateway server failed")?;
    Ok(())
}
