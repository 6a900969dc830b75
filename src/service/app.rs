//! Main application state and service coordination
//!
//! This module contains the production AppState that coordinates all
//! service components, the matchmaker, stores, and background tasks.

use crate::config::AppConfig;
use crate::matchmaker::{InterestOverlapMatcher, Matchmaker, MatchingConfig};
use crate::metrics::MetricsCollector;
use crate::storage::{InMemoryMatchLedger, InMemoryMessageStore, InMemoryQueueJournal};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking component
    matchmaker: Arc<Matchmaker>,

    /// Metrics collector shared with the matchmaker
    metrics_collector: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    /// Process start time for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing common-ground matchmaking service");
        info!(
            "Configuration: service={}, bind={}, score_threshold={}",
            config.service.name,
            config.bind_address(),
            config.matching.score_threshold
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        // Process-local write-through targets; production deployments swap
        // these for the external persistence collaborators.
        let ledger = Arc::new(InMemoryMatchLedger::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let journal = Arc::new(InMemoryQueueJournal::new());

        let matching_config = MatchingConfig {
            score_threshold: config.matching.score_threshold,
        };

        let matchmaker = Arc::new(Matchmaker::with_matcher(
            ledger,
            messages,
            journal,
            Arc::new(InterestOverlapMatcher::new()),
            matching_config,
            metrics_collector.clone(),
        ));

        Ok(Self {
            config,
            matchmaker,
            metrics_collector,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Start background services
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting common-ground matchmaking service");

        *self.is_running.write().await = true;
        self.start_background_tasks();

        info!("✅ Common-ground matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of common-ground service");

        *self.is_running.write().await = false;
        self.stop_background_tasks().await;

        let final_stats =
            self.matchmaker
                .get_stats()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;
        info!("Final service statistics: {:?}", final_stats);

        info!("✅ Common-ground service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the matchmaker for operations
    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        self.matchmaker.clone()
    }

    /// Get the metrics collector
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Time elapsed since the service was initialized
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        info!(
            "Starting stats refresh task ({}s interval)...",
            self.config.stats_interval().as_secs()
        );

        let stats_task = {
            let matchmaker = self.matchmaker.clone();
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();
            let interval_duration = self.config.stats_interval();
            let started_at = self.started_at;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(interval_duration);
                info!("Stats refresh task started");

                while *is_running.read().await {
                    interval.tick().await;

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(started_at.elapsed().as_secs() as i64);

                    match matchmaker.get_stats() {
                        Ok(stats) => {
                            debug!(
                                "Refreshed stats - connections: {}, waiting: {}, matches: {}",
                                stats.active_connections, stats.users_waiting, stats.matches_formed
                            );
                            metrics_collector.update_from_stats(&stats);
                            metrics_collector.update_health_status(2);
                        }
                        Err(e) => {
                            warn!("Failed to refresh matchmaker stats: {}", e);
                            metrics_collector.update_health_status(1);
                        }
                    }
                }

                info!("Stats refresh task stopped");
            })
        };

        self.background_tasks.push(stats_task);
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);
        for task in self.background_tasks.drain(..) {
            task.abort();
        }

        // Give tasks time to observe the abort
        tokio::time::sleep(Duration::from_millis(100)).await;
        info!("✅ All {} background tasks stopped", task_count);
    }
}
