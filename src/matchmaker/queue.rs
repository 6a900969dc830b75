//! Waiting queue of users available for matching
//!
//! One entry per user: re-entry replaces the existing entry in place, keeping
//! its original queue position (which also keeps the matcher's first-seen
//! tie-break stable across re-declarations of interest).

use crate::types::{QueueEntry, UserId};
use crate::utils::current_timestamp;

/// The set of users currently waiting to be matched, in insertion order
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: Vec<QueueEntry>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a user and return a copy of it.
    ///
    /// Empty interest lists are legal; such users simply score 0 against
    /// everyone and wait until the other side carries the overlap.
    pub fn enqueue(&mut self, user_id: UserId, interests: Vec<String>) -> QueueEntry {
        let entry = QueueEntry {
            user_id,
            interests,
            enqueued_at: current_timestamp(),
        };

        match self
            .entries
            .iter_mut()
            .find(|existing| existing.user_id == entry.user_id)
        {
            Some(existing) => *existing = entry.clone(),
            None => self.entries.push(entry.clone()),
        }

        entry
    }

    /// Delete the entry for a user if present; no-op otherwise
    pub fn remove(&mut self, user_id: &str) -> Option<QueueEntry> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.user_id == user_id)?;
        Some(self.entries.remove(position))
    }

    /// Point-in-time view in insertion order, stable for one matching pass
    pub fn snapshot(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
