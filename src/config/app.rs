//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! common-ground matchmaking service, including environment variable and
//! TOML file loading with validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub matching: MatchingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Interval for the periodic stats/metrics refresh task in seconds
    pub stats_interval_seconds: u64,
}

/// Transport/server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address for the WebSocket and HTTP endpoints
    pub host: String,
    /// Bind port
    pub port: u16,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Minimum overlap score a candidate must strictly exceed for a pairing
    pub score_threshold: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "common-ground".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
            stats_interval_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            score_threshold: 30.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(interval) = env::var("STATS_INTERVAL_SECONDS") {
            config.service.stats_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid STATS_INTERVAL_SECONDS value: {}", interval))?;
        }

        // Server settings
        if let Ok(host) = env::var("BIND_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("BIND_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid BIND_PORT value: {}", port))?;
        }

        // Matching settings
        if let Ok(threshold) = env::var("MATCH_SCORE_THRESHOLD") {
            config.matching.score_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_SCORE_THRESHOLD value: {}", threshold))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get stats refresh interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.service.stats_interval_seconds)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.stats_interval_seconds == 0 {
        return Err(anyhow!("Stats interval must be greater than 0"));
    }

    // Validate matching settings
    if !(0.0..=100.0).contains(&config.matching.score_threshold) {
        return Err(anyhow!(
            "Score threshold must be within 0-100, got {}",
            config.matching.score_threshold
        ));
    }

    Ok(())
}
