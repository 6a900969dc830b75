//! HTTP and WebSocket server for the matchmaking service
//!
//! One axum router carries the WebSocket gateway, the health and metrics
//! endpoints, and the read-only match/message history contracts.

pub mod routes;
pub mod ws;

use crate::error::Result;
use crate::service::AppState;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Build the service router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/matches/{user_id}", get(routes::active_matches))
        .route(
            "/messages/{user_id}/{partner_id}",
            get(routes::message_history),
        )
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = state.config().bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("Listening on {}", address);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
