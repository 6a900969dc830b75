//! Match ledger for durable records of formed pairings

use crate::error::{MatchingError, Result};
use crate::types::{MatchId, MatchRecord, MatchState, UserId};
use crate::utils::{current_timestamp, generate_match_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for persisting and reading match records
#[async_trait]
pub trait MatchLedger: Send + Sync {
    /// Persist a new match in state `active`; the only creation path is a
    /// successful pairing decision
    async fn create_match(&self, participant_ids: [UserId; 2], score: f64) -> Result<MatchRecord>;

    /// All active matches the given user participates in
    async fn list_active_matches_for(&self, user_id: &str) -> Result<Vec<MatchRecord>>;

    /// Look up a single match by id
    async fn get_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>>;

    /// Transition a match to `ended`; invoked by an external collaborator,
    /// never by the matcher
    async fn mark_ended(&self, match_id: MatchId) -> Result<MatchRecord>;
}

/// In-memory match ledger implementation
#[derive(Debug, Default)]
pub struct InMemoryMatchLedger {
    records: RwLock<HashMap<MatchId, MatchRecord>>,
}

impl InMemoryMatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records regardless of state
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

fn validate_match(participant_ids: &[UserId; 2], score: f64) -> Result<()> {
    if participant_ids[0] == participant_ids[1] {
        return Err(MatchingError::InvalidQueueRequest {
            reason: "Match participants must be distinct".to_string(),
        }
        .into());
    }
    if !(0.0..=100.0).contains(&score) {
        return Err(MatchingError::InternalError {
            message: format!("Match score out of range: {}", score),
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl MatchLedger for InMemoryMatchLedger {
    async fn create_match(&self, participant_ids: [UserId; 2], score: f64) -> Result<MatchRecord> {
        validate_match(&participant_ids, score)?;

        let record = MatchRecord {
            match_id: generate_match_id(),
            participant_ids,
            score,
            state: MatchState::Active,
            created_at: current_timestamp(),
        };

        let mut records = self.records.write().await;
        records.insert(record.match_id, record.clone());

        debug!(
            "Persisted match {} between '{}' and '{}' (score {:.1})",
            record.match_id, record.participant_ids[0], record.participant_ids[1], record.score
        );

        Ok(record)
    }

    async fn list_active_matches_for(&self, user_id: &str) -> Result<Vec<MatchRecord>> {
        let records = self.records.read().await;

        let mut matches: Vec<MatchRecord> = records
            .values()
            .filter(|record| record.state == MatchState::Active && record.involves(user_id))
            .cloned()
            .collect();

        matches.sort_by_key(|record| record.created_at);
        Ok(matches)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&match_id).cloned())
    }

    async fn mark_ended(&self, match_id: MatchId) -> Result<MatchRecord> {
        let mut records = self.records.write().await;

        let record = records
            .get_mut(&match_id)
            .ok_or_else(|| MatchingError::MatchNotFound {
                match_id: match_id.to_string(),
            })?;

        record.state = MatchState::Ended;
        Ok(record.clone())
    }
}

/// Failure-injectable ledger for testing rollback paths
#[derive(Debug, Default)]
pub struct MockMatchLedger {
    inner: InMemoryMatchLedger,
    fail_creates: AtomicBool,
    create_attempts: AtomicU64,
}

impl MockMatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create_match` fail
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_match` calls observed, including failed ones
    pub fn create_attempts(&self) -> u64 {
        self.create_attempts.load(Ordering::SeqCst)
    }

    /// Total persisted records (for testing)
    pub async fn record_count(&self) -> usize {
        self.inner.record_count().await
    }
}

#[async_trait]
impl MatchLedger for MockMatchLedger {
    async fn create_match(&self, participant_ids: [UserId; 2], score: f64) -> Result<MatchRecord> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(MatchingError::MatchPersistenceFailed {
                reason: "Injected ledger failure".to_string(),
            }
            .into());
        }

        self.inner.create_match(participant_ids, score).await
    }

    async fn list_active_matches_for(&self, user_id: &str) -> Result<Vec<MatchRecord>> {
        self.inner.list_active_matches_for(user_id).await
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>> {
        self.inner.get_match(match_id).await
    }

    async fn mark_ended(&self, match_id: MatchId) -> Result<MatchRecord> {
        self.inner.mark_ended(match_id).await
    }
}
