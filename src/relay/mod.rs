//! Relay: routes payloads to a specific online peer connection
//!
//! The relay only ever pushes onto a connection's outbound channel; the
//! transport task owns the socket and drains the channel. A routing miss
//! (receiver offline, or the channel already closed) is not an error: chat
//! content is persisted before delivery is attempted, and committed matches
//! are never rolled back over a missed notification.

use crate::matchmaker::ConnectionRegistry;
use crate::types::{
    MatchFoundEvent, ReceiveMessageEvent, ServerEvent, UserTypingEvent,
};
use tracing::{debug, warn};

/// Stateless delivery component over the connection registry
#[derive(Debug, Clone, Default)]
pub struct Relay;

impl Relay {
    pub fn new() -> Self {
        Self
    }

    /// Push an already-persisted chat message to the receiver, if online.
    ///
    /// Returns whether the payload reached a live connection.
    pub fn deliver_direct(
        &self,
        registry: &ConnectionRegistry,
        receiver_id: &str,
        message: ReceiveMessageEvent,
    ) -> bool {
        self.push(
            registry,
            receiver_id,
            ServerEvent::ReceiveMessage(message),
            "message",
        )
    }

    /// Forward a typing indicator, best-effort and never persisted
    pub fn deliver_typing(
        &self,
        registry: &ConnectionRegistry,
        sender_id: &str,
        receiver_id: &str,
    ) -> bool {
        self.push(
            registry,
            receiver_id,
            ServerEvent::UserTyping(UserTypingEvent {
                sender_id: sender_id.to_string(),
            }),
            "typing",
        )
    }

    /// Push a match notification to exactly one participant.
    ///
    /// Called twice per formed match, once per side. A miss is logged and the
    /// match persists; the offline participant reads it from history later.
    pub fn deliver_match_notice(
        &self,
        registry: &ConnectionRegistry,
        user_id: &str,
        notice: MatchFoundEvent,
    ) -> bool {
        let delivered = self.push(
            registry,
            user_id,
            ServerEvent::MatchFound(notice.clone()),
            "match notice",
        );

        if !delivered {
            warn!(
                "Delivery miss: match {} notification for offline user '{}'",
                notice.match_id, user_id
            );
        }

        delivered
    }

    fn push(
        &self,
        registry: &ConnectionRegistry,
        receiver_id: &str,
        event: ServerEvent,
        kind: &str,
    ) -> bool {
        let Some(handle) = registry.connection_for(receiver_id) else {
            debug!("Dropping {} for offline user '{}'", kind, receiver_id);
            return false;
        };

        // A closed channel means the connection task is already gone; treat
        // it the same as offline.
        if handle.sender.send(event).is_err() {
            debug!(
                "Dropping {} for '{}': connection channel closed",
                kind, receiver_id
            );
            return false;
        }

        true
    }
}
