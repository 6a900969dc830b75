//! Core matchmaking: connection registry, waiting queue, scoring, and the
//! single state owner that coordinates them

pub mod manager;
pub mod queue;
pub mod registry;
pub mod scoring;

// Re-export commonly used types
pub use manager::{Matchmaker, MatchmakerStats};
pub use queue::WaitingQueue;
pub use registry::ConnectionRegistry;
pub use scoring::{InterestOverlapMatcher, MatchingConfig, QueueMatcher, ScoredCandidate};
