//! Interest-overlap scoring and candidate selection
//!
//! This module holds the pure pairing decision: score every other waiting
//! user against the triggering user and pick the single best candidate, if
//! any clears the formation threshold.

use crate::types::{QueueEntry, UserId};
use std::collections::HashSet;

/// A candidate pairing selected from the queue
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub user_id: UserId,
    pub score: f64,
}

/// Configuration for matching behavior
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// A pairing forms only when the winning score is strictly greater
    /// than this
    pub score_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            score_threshold: 30.0,
        }
    }
}

/// Trait for queue matching algorithms
pub trait QueueMatcher: Send + Sync {
    /// Percentage similarity between two interest lists, in 0..=100
    fn score(&self, a: &[String], b: &[String]) -> f64;

    /// Scan a queue snapshot for the best pairing with the triggering user.
    ///
    /// Returns `None` when no candidate strictly exceeds the threshold; the
    /// triggering user then simply stays queued.
    fn select_candidate(
        &self,
        entry: &QueueEntry,
        snapshot: &[QueueEntry],
        config: &MatchingConfig,
    ) -> Option<ScoredCandidate>;
}

/// Set-membership overlap matcher
///
/// Interests are deduplicated before scoring, so declaring a tag twice does
/// not inflate the score. Ties are broken by snapshot order: the candidate
/// seen first wins, and snapshots iterate in queue insertion order.
#[derive(Debug, Default)]
pub struct InterestOverlapMatcher;

impl InterestOverlapMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl QueueMatcher for InterestOverlapMatcher {
    fn score(&self, a: &[String], b: &[String]) -> f64 {
        let a_set: HashSet<&str> = a.iter().map(String::as_str).collect();
        let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();

        // Both sets empty would divide 0 by 0; defined as zero similarity.
        if a_set.is_empty() && b_set.is_empty() {
            return 0.0;
        }

        let overlap = a_set.intersection(&b_set).count();
        let larger = a_set.len().max(b_set.len());

        100.0 * overlap as f64 / larger as f64
    }

    fn select_candidate(
        &self,
        entry: &QueueEntry,
        snapshot: &[QueueEntry],
        config: &MatchingConfig,
    ) -> Option<ScoredCandidate> {
        let mut best: Option<ScoredCandidate> = None;

        for candidate in snapshot {
            if candidate.user_id == entry.user_id {
                continue;
            }

            let score = self.score(&entry.interests, &candidate.interests);

            // Strictly-greater keeps the first-seen candidate on ties.
            match &best {
                Some(current) if score <= current.score => {}
                _ => {
                    best = Some(ScoredCandidate {
                        user_id: candidate.user_id.clone(),
                        score,
                    });
                }
            }
        }

        best.filter(|candidate| candidate.score > config.score_threshold)
    }
}
