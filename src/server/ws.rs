//! WebSocket gateway: one connection per user-facing socket
//!
//! Each socket gets a read loop (this task) and a writer task draining the
//! connection's outbound event channel. The transport delivers one event per
//! connection at a time; cross-connection coordination lives entirely in the
//! matchmaker.

use crate::service::AppState;
use crate::types::{
    ClientEvent, ConnectionHandle, ConnectionId, MessageErrorEvent, QueueErrorEvent, ServerEvent,
};
use crate::utils::generate_connection_id;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// Upgrade an incoming connection to a WebSocket session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection until it closes
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = generate_connection_id();
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();

    info!("New connection: {}", connection_id);
    state.metrics_collector().record_connection_opened();

    // Writer task: drain the outbound channel onto the socket.
    let writer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(rx);
        while let Some(event) = events.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };

            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: one inbound event at a time.
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                debug!("Connection {} read error: {}", connection_id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                handle_frame(&state, connection_id, &tx, text.as_str()).await;
            }
            Message::Close(_) => break,
            // Ping/pong are answered at the protocol layer; binary is ignored.
            _ => {}
        }
    }

    // Transport-level disconnect: cancels queue membership and the registry
    // binding, never committed matches.
    if let Err(e) = state.matchmaker().handle_disconnect(connection_id).await {
        warn!("Disconnect cleanup failed for {}: {}", connection_id, e);
    }
    state.metrics_collector().record_connection_closed();
    writer.abort();

    info!("Connection closed: {}", connection_id);
}

/// Decode and dispatch a single inbound frame.
///
/// Every failure is scoped to this connection: a reply event on its own
/// channel, no shared state touched beyond the operation itself.
async fn handle_frame(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            debug!("Connection {} sent malformed frame: {}", connection_id, e);
            let _ = tx.send(ServerEvent::QueueError(QueueErrorEvent {
                message: "Malformed event payload".to_string(),
            }));
            return;
        }
    };

    let matchmaker = state.matchmaker();

    match event {
        ClientEvent::JoinQueue(request) => {
            let handle = ConnectionHandle::new(connection_id, tx.clone());
            if let Err(e) = matchmaker.handle_join_queue(request, handle).await {
                warn!("Queue join failed on connection {}: {}", connection_id, e);
                let _ = tx.send(ServerEvent::QueueError(QueueErrorEvent {
                    message: "Failed to join queue".to_string(),
                }));
            }
        }
        ClientEvent::PrivateMessage(request) => {
            match matchmaker.handle_private_message(request).await {
                Ok(ack) => {
                    // Acknowledgement-of-send goes back on the originating
                    // socket, never through the registry.
                    let _ = tx.send(ServerEvent::MessageSent(ack));
                }
                Err(e) => {
                    warn!("Message send failed on connection {}: {}", connection_id, e);
                    let _ = tx.send(ServerEvent::MessageError(MessageErrorEvent {
                        message: "Failed to send message".to_string(),
                    }));
                }
            }
        }
        ClientEvent::Typing(request) => {
            if let Err(e) = matchmaker.handle_typing(request).await {
                debug!("Typing relay failed on connection {}: {}", connection_id, e);
            }
        }
    }
}
