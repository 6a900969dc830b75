//! Configuration management for the common-ground service
//!
//! This module handles all configuration loading from environment variables,
//! TOML files, validation, and default values for the matchmaking service.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, MatchingSettings, ServerSettings, ServiceSettings};
