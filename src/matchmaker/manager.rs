//! Matchmaker implementation: the single owner of connection and queue state
//!
//! This module provides the core Matchmaker that coordinates the connection
//! registry, the waiting queue, pairing decisions, match persistence, and
//! delivery through the relay.

use crate::error::{MatchingError, Result};
use crate::matchmaker::queue::WaitingQueue;
use crate::matchmaker::registry::ConnectionRegistry;
use crate::matchmaker::scoring::{InterestOverlapMatcher, MatchingConfig, QueueMatcher};
use crate::metrics::MetricsCollector;
use crate::relay::Relay;
use crate::storage::{MatchLedger, MessageStore, QueueJournal};
use crate::types::{
    ConnectionHandle, ConnectionId, JoinQueueRequest, MatchFoundEvent, MatchRecord,
    MessageSentEvent, PrivateMessageRequest, QueueEntry, ReceiveMessageEvent, TypingRequest,
    UserId,
};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about matchmaker operations
#[derive(Debug, Clone, Default)]
pub struct MatchmakerStats {
    /// Total queue join requests processed
    pub queue_joins: u64,
    /// Total matches formed
    pub matches_formed: u64,
    /// Total chat messages relayed (delivered or dropped offline)
    pub messages_relayed: u64,
    /// Payloads that found no live connection
    pub delivery_misses: u64,
    /// Current number of users with a live connection
    pub active_connections: usize,
    /// Current number of users waiting in the queue
    pub users_waiting: usize,
}

/// Registry and queue live behind one lock: every pairing decision and every
/// disconnect mutates both under the same critical section, so the two can
/// never disagree about a user's online status mid-decision.
#[derive(Debug, Default)]
struct CoreState {
    registry: ConnectionRegistry,
    queue: WaitingQueue,
}

/// The outcome of a pairing decision taken under the state lock
struct PairingDecision {
    own_entry: QueueEntry,
    partner_entry: QueueEntry,
    score: f64,
}

/// The main matchmaker
#[derive(Clone)]
pub struct Matchmaker {
    /// Connection registry + waiting queue under a single lock
    state: Arc<RwLock<CoreState>>,
    /// Pairing algorithm
    matcher: Arc<dyn QueueMatcher>,
    /// Matching configuration
    matching_config: MatchingConfig,
    /// Durable match records
    ledger: Arc<dyn MatchLedger>,
    /// Durable chat messages
    messages: Arc<dyn MessageStore>,
    /// Asynchronous queue audit log
    journal: Arc<dyn QueueJournal>,
    /// Delivery to online peers
    relay: Relay,
    /// Matchmaker statistics
    stats: Arc<RwLock<MatchmakerStats>>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
}

impl Matchmaker {
    /// Create a new matchmaker with the default matcher and configuration
    pub fn new(
        ledger: Arc<dyn MatchLedger>,
        messages: Arc<dyn MessageStore>,
        journal: Arc<dyn QueueJournal>,
    ) -> Self {
        Self::with_metrics(
            ledger,
            messages,
            journal,
            Arc::new(MetricsCollector::default()),
        )
    }

    /// Create a new matchmaker with an explicit metrics collector
    pub fn with_metrics(
        ledger: Arc<dyn MatchLedger>,
        messages: Arc<dyn MessageStore>,
        journal: Arc<dyn QueueJournal>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self::with_matcher(
            ledger,
            messages,
            journal,
            Arc::new(InterestOverlapMatcher::new()),
            MatchingConfig::default(),
            metrics_collector,
        )
    }

    /// Create with custom matcher, configuration, and metrics
    pub fn with_matcher(
        ledger: Arc<dyn MatchLedger>,
        messages: Arc<dyn MessageStore>,
        journal: Arc<dyn QueueJournal>,
        matcher: Arc<dyn QueueMatcher>,
        matching_config: MatchingConfig,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(CoreState::default())),
            matcher,
            matching_config,
            ledger,
            messages,
            journal,
            relay: Relay::new(),
            stats: Arc::new(RwLock::new(MatchmakerStats::default())),
            metrics_collector,
        }
    }

    /// Handle a queue join from a connected user.
    ///
    /// Registers the connection (last one wins), stores the interest
    /// snapshot, and synchronously evaluates the queue for a pairing.
    /// Returns the formed match, if any; `Ok(None)` means the user stays
    /// queued with no error.
    pub async fn handle_join_queue(
        &self,
        request: JoinQueueRequest,
        handle: ConnectionHandle,
    ) -> Result<Option<MatchRecord>> {
        if request.user_id.is_empty() {
            return Err(MatchingError::InvalidQueueRequest {
                reason: "User ID cannot be empty".to_string(),
            }
            .into());
        }

        info!(
            "Processing queue join - user_id: '{}', interests: {:?}",
            request.user_id, request.interests
        );

        // Register, enqueue, and decide the pairing under one critical
        // section so a concurrent disconnect cannot interleave with winner
        // selection.
        let decision = {
            let mut state = self
                .state
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire state lock".to_string(),
                })?;

            state.registry.register(request.user_id.clone(), handle);
            let entry = state
                .queue
                .enqueue(request.user_id.clone(), request.interests.clone());
            self.spawn_journal_enqueued(entry.clone());

            let candidate =
                self.matcher
                    .select_candidate(&entry, state.queue.snapshot(), &self.matching_config);

            match candidate {
                Some(candidate) => {
                    // Both entries leave together or neither does.
                    let own_entry = state.queue.remove(&entry.user_id).ok_or_else(|| {
                        MatchingError::InternalError {
                            message: format!("Queue entry vanished for '{}'", entry.user_id),
                        }
                    })?;
                    let partner_entry =
                        state.queue.remove(&candidate.user_id).ok_or_else(|| {
                            MatchingError::InternalError {
                                message: format!(
                                    "Queue entry vanished for '{}'",
                                    candidate.user_id
                                ),
                            }
                        })?;

                    Some(PairingDecision {
                        own_entry,
                        partner_entry,
                        score: candidate.score,
                    })
                }
                None => None,
            }
        };

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.queue_joins += 1;
        }
        self.metrics_collector.record_queue_join();

        let Some(decision) = decision else {
            debug!(
                "No candidate above threshold for '{}', user stays queued",
                request.user_id
            );
            self.refresh_gauges()?;
            return Ok(None);
        };

        // Queue removal and record persistence form one logical transaction:
        // if the write fails, both users go back to waiting and only the
        // triggering user sees the error.
        let record = match self
            .ledger
            .create_match(
                [
                    decision.own_entry.user_id.clone(),
                    decision.partner_entry.user_id.clone(),
                ],
                decision.score,
            )
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Match persistence failed for '{}' and '{}', re-queueing both: {}",
                    decision.own_entry.user_id, decision.partner_entry.user_id, e
                );
                self.rollback_pairing(decision.own_entry, decision.partner_entry)?;
                self.metrics_collector.record_match_persistence_failure();
                self.refresh_gauges()?;
                return Err(MatchingError::MatchPersistenceFailed {
                    reason: e.to_string(),
                }
                .into());
            }
        };

        self.spawn_journal_removed(record.participant_ids[0].clone());
        self.spawn_journal_removed(record.participant_ids[1].clone());

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.matches_formed += 1;
        }
        self.metrics_collector.record_match_formed(record.score);

        info!(
            "Match {} formed between '{}' and '{}' (score {:.1})",
            record.match_id, record.participant_ids[0], record.participant_ids[1], record.score
        );

        self.notify_participants(&record)?;
        self.refresh_gauges()?;

        Ok(Some(record))
    }

    /// Handle a direct chat message.
    ///
    /// The message is persisted unconditionally before any delivery attempt;
    /// an offline receiver is a silent drop, not an error. Returns the
    /// acknowledgement-of-send for the originating connection.
    pub async fn handle_private_message(
        &self,
        request: PrivateMessageRequest,
    ) -> Result<MessageSentEvent> {
        if request.sender_id.is_empty() || request.receiver_id.is_empty() {
            return Err(MatchingError::InvalidMessage {
                reason: "Sender and receiver IDs cannot be empty".to_string(),
            }
            .into());
        }
        if request.content.trim().is_empty() {
            return Err(MatchingError::InvalidMessage {
                reason: "Message content cannot be empty".to_string(),
            }
            .into());
        }

        let stored = self
            .messages
            .append(
                request.sender_id.clone(),
                request.receiver_id.clone(),
                request.content.clone(),
            )
            .await
            .map_err(|e| MatchingError::MessagePersistenceFailed {
                reason: e.to_string(),
            })?;

        let delivered = {
            let state = self.state.read().map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire state lock".to_string(),
            })?;

            self.relay.deliver_direct(
                &state.registry,
                &request.receiver_id,
                ReceiveMessageEvent {
                    message_id: stored.message_id,
                    sender_id: stored.sender_id.clone(),
                    content: stored.content.clone(),
                    timestamp: stored.timestamp,
                },
            )
        };

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.messages_relayed += 1;
            if !delivered {
                stats.delivery_misses += 1;
            }
        }
        self.metrics_collector.record_message_relayed(delivered);

        debug!(
            "Message {} from '{}' to '{}' persisted (delivered: {})",
            stored.message_id, stored.sender_id, stored.receiver_id, delivered
        );

        Ok(MessageSentEvent {
            message_id: stored.message_id,
            timestamp: stored.timestamp,
        })
    }

    /// Forward a typing indicator, best-effort and never persisted
    pub async fn handle_typing(&self, request: TypingRequest) -> Result<()> {
        let delivered = {
            let state = self.state.read().map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire state lock".to_string(),
            })?;

            self.relay
                .deliver_typing(&state.registry, &request.sender_id, &request.receiver_id)
        };

        self.metrics_collector.record_typing_relayed(delivered);
        Ok(())
    }

    /// Handle a transport-level disconnect.
    ///
    /// Cancels only the departing user's registry binding and queue
    /// membership; committed matches are unaffected. Idempotent for unknown
    /// or superseded handles.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) -> Result<Option<UserId>> {
        let removed = {
            let mut state = self
                .state
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire state lock".to_string(),
                })?;

            match state.registry.unregister(connection_id) {
                Some(user_id) => {
                    let was_queued = state.queue.remove(&user_id).is_some();
                    Some((user_id, was_queued))
                }
                None => None,
            }
        };

        let Some((user_id, was_queued)) = removed else {
            return Ok(None);
        };

        if was_queued {
            self.spawn_journal_removed(user_id.clone());
        }
        self.refresh_gauges()?;

        debug!(
            "User '{}' disconnected (was queued: {})",
            user_id, was_queued
        );
        Ok(Some(user_id))
    }

    /// Re-insert both halves of a failed pairing.
    ///
    /// A user who disconnected during the persistence window stays out: a
    /// queue entry must never outlive its registry binding.
    fn rollback_pairing(&self, own_entry: QueueEntry, partner_entry: QueueEntry) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire state lock".to_string(),
            })?;

        for entry in [own_entry, partner_entry] {
            if state.registry.is_online(&entry.user_id) {
                state.queue.enqueue(entry.user_id, entry.interests);
            } else {
                debug!(
                    "Skipping rollback re-queue for '{}': no longer online",
                    entry.user_id
                );
            }
        }

        Ok(())
    }

    /// Push the match notification to both participants.
    ///
    /// Lookups happen at notification time; a participant who disconnected
    /// in the persistence window is a logged miss, never a rollback.
    fn notify_participants(&self, record: &MatchRecord) -> Result<()> {
        let mut misses = 0u64;

        {
            let state = self.state.read().map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire state lock".to_string(),
            })?;

            let [first, second] = &record.participant_ids;
            for (user_id, partner_id) in [(first, second), (second, first)] {
                let delivered = self.relay.deliver_match_notice(
                    &state.registry,
                    user_id,
                    MatchFoundEvent {
                        match_id: record.match_id,
                        partner_id: partner_id.clone(),
                        score: record.score,
                    },
                );

                if !delivered {
                    misses += 1;
                    self.metrics_collector.record_notice_miss();
                }
            }
        }

        if misses > 0 {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.delivery_misses += misses;
        }

        Ok(())
    }

    /// Record queue enqueue in the audit journal off the join path
    fn spawn_journal_enqueued(&self, entry: QueueEntry) {
        let journal = Arc::clone(&self.journal);
        tokio::spawn(async move {
            if let Err(e) = journal.record_enqueued(entry).await {
                warn!("Queue journal write failed: {}", e);
            }
        });
    }

    /// Record queue removal in the audit journal off the hot path
    fn spawn_journal_removed(&self, user_id: UserId) {
        let journal = Arc::clone(&self.journal);
        tokio::spawn(async move {
            if let Err(e) = journal.record_removed(user_id).await {
                warn!("Queue journal write failed: {}", e);
            }
        });
    }

    /// Refresh gauge-style stats and metrics from current state
    fn refresh_gauges(&self) -> Result<()> {
        let (online, waiting) = {
            let state = self.state.read().map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire state lock".to_string(),
            })?;
            (state.registry.online_count(), state.queue.len())
        };

        let stats_snapshot = {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| MatchingError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.active_connections = online;
            stats.users_waiting = waiting;
            stats.clone()
        };

        self.metrics_collector.update_from_stats(&stats_snapshot);
        Ok(())
    }

    /// Get current matchmaker statistics
    pub fn get_stats(&self) -> Result<MatchmakerStats> {
        self.refresh_gauges()?;

        let stats = self
            .stats
            .read()
            .map_err(|_| MatchingError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;

        Ok(stats.clone())
    }

    /// Whether the user currently has a live connection
    pub fn is_user_online(&self, user_id: &str) -> Result<bool> {
        let state = self.state.read().map_err(|_| MatchingError::InternalError {
            message: "Failed to acquire state lock".to_string(),
        })?;
        Ok(state.registry.is_online(user_id))
    }

    /// Whether the user is currently waiting in the queue
    pub fn is_user_queued(&self, user_id: &str) -> Result<bool> {
        let state = self.state.read().map_err(|_| MatchingError::InternalError {
            message: "Failed to acquire state lock".to_string(),
        })?;
        Ok(state.queue.contains(user_id))
    }

    /// The match ledger this matchmaker persists into
    pub fn ledger(&self) -> Arc<dyn MatchLedger> {
        Arc::clone(&self.ledger)
    }

    /// The message store this matchmaker persists into
    pub fn message_store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        InMemoryMatchLedger, InMemoryMessageStore, InMemoryQueueJournal, MockMatchLedger,
    };
    use crate::types::{MatchState, ServerEvent};
    use crate::utils::generate_connection_id;
    use tokio::sync::mpsc;

    fn create_test_matchmaker() -> Matchmaker {
        Matchmaker::new(
            Arc::new(InMemoryMatchLedger::new()),
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryQueueJournal::new()),
        )
    }

    fn create_connection() -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(generate_connection_id(), tx), rx)
    }

    fn join_request(user_id: &str, interests: &[&str]) -> JoinQueueRequest {
        JoinQueueRequest {
            user_id: user_id.to_string(),
            interests: interests.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_single_user_stays_queued() {
        let matchmaker = create_test_matchmaker();
        let (handle, _rx) = create_connection();

        let result = matchmaker
            .handle_join_queue(join_request("alice", &["Art"]), handle)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(matchmaker.is_user_online("alice").unwrap());
        assert!(matchmaker.is_user_queued("alice").unwrap());
    }

    #[tokio::test]
    async fn test_compatible_users_are_matched() {
        let matchmaker = create_test_matchmaker();
        let (alice_handle, mut alice_rx) = create_connection();
        let (bob_handle, mut bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("alice", &["NFTs", "DeFi", "Art"]), alice_handle)
            .await
            .unwrap();
        let record = matchmaker
            .handle_join_queue(join_request("bob", &["NFTs", "DeFi"]), bob_handle)
            .await
            .unwrap()
            .expect("match should form");

        assert!((record.score - 66.666).abs() < 0.01);
        assert_eq!(record.state, MatchState::Active);
        assert!(record.involves("alice"));
        assert!(record.involves("bob"));

        // Both left the queue but stay online for chat
        assert!(!matchmaker.is_user_queued("alice").unwrap());
        assert!(!matchmaker.is_user_queued("bob").unwrap());
        assert!(matchmaker.is_user_online("alice").unwrap());
        assert!(matchmaker.is_user_online("bob").unwrap());

        // Both sides got the notification with the right partner
        match alice_rx.recv().await.unwrap() {
            ServerEvent::MatchFound(event) => {
                assert_eq!(event.partner_id, "bob");
                assert_eq!(event.match_id, record.match_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match bob_rx.recv().await.unwrap() {
            ServerEvent::MatchFound(event) => assert_eq!(event.partner_id, "alice"),
            other => panic!("unexpected event: {:?}", other),
        }

        // Exactly one active record in the ledger
        let active = matchmaker
            .ledger()
            .list_active_matches_for("alice")
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_disjoint_interests_both_stay_queued() {
        let matchmaker = create_test_matchmaker();
        let (alice_handle, _alice_rx) = create_connection();
        let (bob_handle, _bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("alice", &["Gaming"]), alice_handle)
            .await
            .unwrap();
        let result = matchmaker
            .handle_join_queue(join_request("bob", &["Travel"]), bob_handle)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(matchmaker.is_user_queued("alice").unwrap());
        assert!(matchmaker.is_user_queued("bob").unwrap());
    }

    #[tokio::test]
    async fn test_highest_scoring_candidate_wins() {
        let matchmaker = create_test_matchmaker();
        let tags: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();

        // bob shares 4 of 10 (score 40), carol shares 5 of 10 (score 50)
        let mut bob_tags: Vec<&str> = tag_refs[..4].to_vec();
        bob_tags.extend(["b0", "b1", "b2", "b3", "b4", "b5"]);
        let mut carol_tags: Vec<&str> = tag_refs[..5].to_vec();
        carol_tags.extend(["c0", "c1", "c2", "c3", "c4"]);

        let (bob_handle, _bob_rx) = create_connection();
        let (carol_handle, _carol_rx) = create_connection();
        let (alice_handle, _alice_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("bob", &bob_tags), bob_handle)
            .await
            .unwrap();
        matchmaker
            .handle_join_queue(join_request("carol", &carol_tags), carol_handle)
            .await
            .unwrap();

        let record = matchmaker
            .handle_join_queue(join_request("alice", &tag_refs), alice_handle)
            .await
            .unwrap()
            .expect("match should form");

        assert!(record.involves("carol"));
        assert_eq!(record.score, 50.0);

        // The runner-up is untouched
        assert!(matchmaker.is_user_queued("bob").unwrap());
    }

    #[tokio::test]
    async fn test_reenqueue_replaces_entry() {
        let matchmaker = create_test_matchmaker();
        let (handle1, _rx1) = create_connection();
        let (handle2, _rx2) = create_connection();

        matchmaker
            .handle_join_queue(join_request("alice", &["Art"]), handle1)
            .await
            .unwrap();
        matchmaker
            .handle_join_queue(join_request("alice", &["Art", "DeFi"]), handle2)
            .await
            .unwrap();

        let stats = matchmaker.get_stats().unwrap();
        assert_eq!(stats.users_waiting, 1);
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.queue_joins, 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_requeues_both() {
        let ledger = Arc::new(MockMatchLedger::new());
        let matchmaker = Matchmaker::new(
            ledger.clone(),
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryQueueJournal::new()),
        );

        let (alice_handle, _alice_rx) = create_connection();
        let (bob_handle, mut bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("alice", &["Art", "DeFi"]), alice_handle)
            .await
            .unwrap();

        ledger.set_fail_creates(true);
        let result = matchmaker
            .handle_join_queue(join_request("bob", &["Art", "DeFi"]), bob_handle)
            .await;

        assert!(result.is_err());
        assert!(matchmaker.is_user_queued("alice").unwrap());
        assert!(matchmaker.is_user_queued("bob").unwrap());
        assert_eq!(ledger.record_count().await, 0);

        // No notification leaked out of the failed formation
        assert!(bob_rx.try_recv().is_err());

        // Retry succeeds once the ledger recovers
        ledger.set_fail_creates(false);
        let (bob_handle2, _bob_rx2) = create_connection();
        let record = matchmaker
            .handle_join_queue(join_request("bob", &["Art", "DeFi"]), bob_handle2)
            .await
            .unwrap()
            .expect("match should form on retry");
        assert_eq!(record.score, 100.0);
    }

    #[tokio::test]
    async fn test_disconnect_mid_queue() {
        let matchmaker = create_test_matchmaker();
        let (alice_handle, _alice_rx) = create_connection();
        let alice_conn = alice_handle.id;

        matchmaker
            .handle_join_queue(join_request("alice", &["Art", "DeFi"]), alice_handle)
            .await
            .unwrap();

        let removed = matchmaker.handle_disconnect(alice_conn).await.unwrap();
        assert_eq!(removed, Some("alice".to_string()));
        assert!(!matchmaker.is_user_online("alice").unwrap());
        assert!(!matchmaker.is_user_queued("alice").unwrap());

        // A compatible join afterwards finds nobody and stays queued
        let (bob_handle, _bob_rx) = create_connection();
        let result = matchmaker
            .handle_join_queue(join_request("bob", &["Art", "DeFi"]), bob_handle)
            .await
            .unwrap();
        assert!(result.is_none());

        // Disconnect is idempotent
        assert_eq!(matchmaker.handle_disconnect(alice_conn).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_message_to_online_receiver() {
        let matchmaker = create_test_matchmaker();
        let (bob_handle, mut bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("bob", &[]), bob_handle)
            .await
            .unwrap();

        let ack = matchmaker
            .handle_private_message(PrivateMessageRequest {
                sender_id: "alice".to_string(),
                receiver_id: "bob".to_string(),
                content: "hello".to_string(),
            })
            .await
            .unwrap();

        match bob_rx.recv().await.unwrap() {
            ServerEvent::ReceiveMessage(msg) => {
                assert_eq!(msg.message_id, ack.message_id);
                assert_eq!(msg.sender_id, "alice");
                assert_eq!(msg.content, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_message_to_offline_receiver_still_persisted() {
        let matchmaker = create_test_matchmaker();

        let ack = matchmaker
            .handle_private_message(PrivateMessageRequest {
                sender_id: "alice".to_string(),
                receiver_id: "bob".to_string(),
                content: "are you there?".to_string(),
            })
            .await
            .unwrap();

        let history = matchmaker
            .message_store()
            .history_between("alice", "bob")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message_id, ack.message_id);

        let stats = matchmaker.get_stats().unwrap();
        assert_eq!(stats.messages_relayed, 1);
        assert_eq!(stats.delivery_misses, 1);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let matchmaker = create_test_matchmaker();

        let result = matchmaker
            .handle_private_message(PrivateMessageRequest {
                sender_id: "alice".to_string(),
                receiver_id: "bob".to_string(),
                content: "   ".to_string(),
            })
            .await;

        assert!(result.is_err());
        let history = matchmaker
            .message_store()
            .history_between("alice", "bob")
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected() {
        let matchmaker = create_test_matchmaker();
        let (handle, _rx) = create_connection();

        let result = matchmaker
            .handle_join_queue(join_request("", &["Art"]), handle)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_typing_relayed_to_online_receiver() {
        let matchmaker = create_test_matchmaker();
        let (bob_handle, mut bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("bob", &[]), bob_handle)
            .await
            .unwrap();

        matchmaker
            .handle_typing(TypingRequest {
                sender_id: "alice".to_string(),
                receiver_id: "bob".to_string(),
            })
            .await
            .unwrap();

        match bob_rx.recv().await.unwrap() {
            ServerEvent::UserTyping(event) => assert_eq!(event.sender_id, "alice"),
            other => panic!("unexpected event: {:?}", other),
        }

        // Typing to an offline user is silently dropped
        matchmaker
            .handle_typing(TypingRequest {
                sender_id: "alice".to_string(),
                receiver_id: "carol".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_interest_users_never_match() {
        let matchmaker = create_test_matchmaker();
        let (alice_handle, _alice_rx) = create_connection();
        let (bob_handle, _bob_rx) = create_connection();

        matchmaker
            .handle_join_queue(join_request("alice", &[]), alice_handle)
            .await
            .unwrap();
        let result = matchmaker
            .handle_join_queue(join_request("bob", &[]), bob_handle)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(matchmaker.is_user_queued("alice").unwrap());
        assert!(matchmaker.is_user_queued("bob").unwrap());
    }
}
