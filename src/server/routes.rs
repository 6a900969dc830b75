//! HTTP endpoints: health, metrics, and the read-only history contracts
//!
//! Match history and chat history are consumed by external collaborators
//! (profile and chat UIs); the response envelope matches what those clients
//! already parse.

use crate::service::{AppState, HealthCheck, HealthStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Standard response envelope for the read endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

fn internal_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

/// GET /healthz
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::check(state).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (code, Json(health)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            internal_error("Health check failed")
        }
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = state.metrics_collector().registry().gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return internal_error("Failed to encode metrics");
    }

    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!("Metrics output was not valid UTF-8: {}", e);
            internal_error("Failed to encode metrics")
        }
    }
}

/// GET /matches/{user_id} lists active matches for a user
pub async fn active_matches(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state
        .matchmaker()
        .ledger()
        .list_active_matches_for(&user_id)
        .await
    {
        Ok(matches) => Json(ApiResponse {
            success: true,
            data: matches,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to list matches for '{}': {}", user_id, e);
            internal_error("Error fetching matches")
        }
    }
}

/// GET /messages/{user_id}/{partner_id} returns both-direction chat history
pub async fn message_history(
    State(state): State<Arc<AppState>>,
    Path((user_id, partner_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state
        .matchmaker()
        .message_store()
        .history_between(&user_id, &partner_id)
        .await
    {
        Ok(messages) => Json(ApiResponse {
            success: true,
            data: messages,
        })
        .into_response(),
        Err(e) => {
            error!(
                "Failed to fetch history between '{}' and '{}': {}",
                user_id, partner_id, e
            );
            internal_error("Error fetching messages")
        }
    }
}
