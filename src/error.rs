//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("Invalid queue request: {reason}")]
    InvalidQueueRequest { reason: String },

    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    #[error("User not connected: {user_id}")]
    UserNotConnected { user_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Match persistence failed: {reason}")]
    MatchPersistenceFailed { reason: String },

    #[error("Message persistence failed: {reason}")]
    MessagePersistenceFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
