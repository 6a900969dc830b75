//! Queue audit journal
//!
//! The in-memory queue is the single authority for matching decisions. The
//! journal is an append-only audit/recovery log written asynchronously off
//! the join path; it is never read back by the matcher, and a failed write is
//! logged rather than surfaced to the user.

use crate::error::Result;
use crate::types::{QueueEntry, UserId};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// One recorded queue transition
#[derive(Debug, Clone)]
pub enum QueueAuditEvent {
    Enqueued(QueueEntry),
    Removed { user_id: UserId, at: DateTime<Utc> },
}

/// Trait for recording queue transitions
#[async_trait]
pub trait QueueJournal: Send + Sync {
    /// Record that a user entered (or re-entered) the waiting queue
    async fn record_enqueued(&self, entry: QueueEntry) -> Result<()>;

    /// Record that a user left the waiting queue (matched or disconnected)
    async fn record_removed(&self, user_id: UserId) -> Result<()>;
}

/// In-memory append-only journal implementation
#[derive(Debug, Default)]
pub struct InMemoryQueueJournal {
    events: RwLock<Vec<QueueAuditEvent>>,
}

impl InMemoryQueueJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events (for testing and recovery tooling)
    pub async fn events(&self) -> Vec<QueueAuditEvent> {
        self.events.read().await.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl QueueJournal for InMemoryQueueJournal {
    async fn record_enqueued(&self, entry: QueueEntry) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(QueueAuditEvent::Enqueued(entry));
        Ok(())
    }

    async fn record_removed(&self, user_id: UserId) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(QueueAuditEvent::Removed {
            user_id,
            at: current_timestamp(),
        });
        Ok(())
    }
}
