//! Common Ground - Interest-overlap matchmaking service
//!
//! This crate connects online users into a live matching queue, pairs them
//! by interest-overlap score, and relays direct messages and typing
//! indicators between matched peers in real time.

pub mod config;
pub mod error;
pub mod matchmaker;
pub mod metrics;
pub mod relay;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaker::{Matchmaker, MatchmakerStats};
pub use relay::Relay;
pub use storage::{MatchLedger, MessageStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
