//! Message store for durable chat history
//!
//! Messages are persisted unconditionally before any delivery attempt, so an
//! offline receiver still finds them in history on next login.

use crate::error::{MatchingError, Result};
use crate::types::{StoredMessage, UserId};
use crate::utils::{current_timestamp, generate_message_id};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Trait for persisting and reading direct messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a new message and return the persisted form (id + timestamp)
    async fn append(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
    ) -> Result<StoredMessage>;

    /// Both-direction history between two users, oldest first
    async fn history_between(&self, user_id: &str, partner_id: &str) -> Result<Vec<StoredMessage>>;
}

/// In-memory message store implementation
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages (for testing and stats)
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
    ) -> Result<StoredMessage> {
        let message = StoredMessage {
            message_id: generate_message_id(),
            sender_id,
            receiver_id,
            content,
            timestamp: current_timestamp(),
        };

        let mut messages = self.messages.write().await;
        messages.push(message.clone());

        Ok(message)
    }

    async fn history_between(&self, user_id: &str, partner_id: &str) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;

        let mut history: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_id && m.receiver_id == partner_id)
                    || (m.sender_id == partner_id && m.receiver_id == user_id)
            })
            .cloned()
            .collect();

        history.sort_by_key(|m| m.timestamp);
        Ok(history)
    }
}

/// Failure-injectable message store for testing error paths
#[derive(Debug, Default)]
pub struct MockMessageStore {
    inner: InMemoryMessageStore,
    fail_appends: AtomicBool,
}

impl MockMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Total persisted messages (for testing)
    pub async fn message_count(&self) -> usize {
        self.inner.message_count().await
    }
}

#[async_trait]
impl MessageStore for MockMessageStore {
    async fn append(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
    ) -> Result<StoredMessage> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(MatchingError::MessagePersistenceFailed {
                reason: "Injected store failure".to_string(),
            }
            .into());
        }

        self.inner.append(sender_id, receiver_id, content).await
    }

    async fn history_between(&self, user_id: &str, partner_id: &str) -> Result<Vec<StoredMessage>> {
        self.inner.history_between(user_id, partner_id).await
    }
}
