//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stable user identity, issued by the external profile store
pub type UserId = String;

/// Ephemeral identifier for a single transport connection
pub type ConnectionId = Uuid;

/// Unique identifier for formed matches
pub type MatchId = Uuid;

/// Opaque transport reference bound to a connected user.
///
/// The sender side of the connection's outbound event channel; pushing an
/// event never blocks, the transport task drains the channel onto the socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { id, sender }
    }
}

/// A waiting user's interest snapshot, held until matched or disconnected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    /// Declared interest tags in client order; duplicates are permitted here
    /// and collapsed during scoring
    pub interests: Vec<String>,
    pub enqueued_at: DateTime<Utc>,
}

/// Lifecycle state of a formed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Pending,
    Active,
    Ended,
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchState::Pending => write!(f, "pending"),
            MatchState::Active => write!(f, "active"),
            MatchState::Ended => write!(f, "ended"),
        }
    }
}

/// Durable record of a formed pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: MatchId,
    /// Exactly two distinct user ids
    pub participant_ids: [UserId; 2],
    /// Overlap score in 0..=100
    pub score: f64,
    pub state: MatchState,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Whether the given user is one of the two participants
    pub fn involves(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == user_id)
    }

    /// The other participant's id, if the given user is a participant
    pub fn partner_of(&self, user_id: &str) -> Option<&UserId> {
        match &self.participant_ids {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }
}

/// A persisted chat message, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub message_id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Wire Event Types
/// Request to join the matching queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub user_id: UserId,
    pub interests: Vec<String>,
}

/// Direct chat message from one user to another
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageRequest {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

/// Typing indicator, best-effort and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub sender_id: UserId,
    pub receiver_id: UserId,
}

/// Union type for all client-originated events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinQueue(JoinQueueRequest),
    PrivateMessage(PrivateMessageRequest),
    Typing(TypingRequest),
}

/// Reported to the originating connection when a queue operation fails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueErrorEvent {
    pub message: String,
}

/// Acknowledgement-of-send returned to the message sender
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentEvent {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Chat message delivered to the receiving connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveMessageEvent {
    pub message_id: Uuid,
    pub sender_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Reported to the sender when message persistence fails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageErrorEvent {
    pub message: String,
}

/// Typing indicator forwarded to the receiving connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingEvent {
    pub sender_id: UserId,
}

/// Pushed to both participants when a pairing is formed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFoundEvent {
    pub match_id: MatchId,
    pub partner_id: UserId,
    pub score: f64,
}

/// Union type for all server-originated events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    QueueError(QueueErrorEvent),
    MessageSent(MessageSentEvent),
    ReceiveMessage(ReceiveMessageEvent),
    MessageError(MessageErrorEvent),
    UserTyping(UserTypingEvent),
    MatchFound(MatchFoundEvent),
}
