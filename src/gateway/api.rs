//! REST handlers for the gateway.

use super::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "user-session";

// ── Request / response bodies ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub query: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub query: String,
    pub intent: String,
    pub confidence: f64,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    pub limit: Option<usize>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /predict_intent: run one dialogue turn
pub async fn handle_predict_intent(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable predict_intent body");
            return error_response(StatusCode::BAD_REQUEST, "Query is required");
        }
    };

    let Some(query) = request.query.filter(|q| !q.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Query is required");
    };
    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let result = state.manager.process_turn(&session_id, &query).await;
    Json(PredictResponse {
        query: crate::security::mask_sensitive(&query),
        intent: result.intent,
        confidence: result.confidence,
        response: result.response,
    })
    .into_response()
}

/// POST /sessions/{id}/reset: drop state and transcript
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.manager.reset_session(&session_id).await;
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /sessions/{id}/transcript: ordered transcript entries
pub async fn handle_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<TranscriptQuery>,
) -> Response {
    match state.manager.transcript(&session_id, params.limit).await {
        Ok(entries) => Json(entries).into_response(),
        Err(error) => {
            tracing::warn!(session_id, %error, "transcript lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read transcript")
        }
    }
}

/// GET /health: liveness and wiring summary
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "classifier": state.manager.classifier_name(),
        "tools": state.manager.tools().names(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

/// GET /metrics: Prometheus text exposition
pub async fn handle_metrics() -> Response {
    match crate::observability::encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(error) => {
            tracing::warn!(%error, "metrics encoding failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
        }
    }
}
