//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the common-ground matchmaking
//! service using Prometheus metrics.

use crate::matchmaker::manager::MatchmakerStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Connection-related metrics
    connection_metrics: ConnectionMetrics,

    /// Matching-related metrics
    matching_metrics: MatchingMetrics,

    /// Relay-related metrics
    relay_metrics: RelayMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Connection-related metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    /// Number of users with a live connection
    pub active_connections: IntGauge,

    /// Number of users currently waiting in the matching queue
    pub users_waiting: IntGauge,

    /// Total connections opened
    pub connections_opened_total: IntCounter,

    /// Total connections closed
    pub connections_closed_total: IntCounter,
}

/// Matching-related metrics
#[derive(Clone)]
pub struct MatchingMetrics {
    /// Total queue join requests processed
    pub queue_joins_total: IntCounter,

    /// Total matches formed
    pub matches_formed_total: IntCounter,

    /// Distribution of formed match scores
    pub match_score: Histogram,

    /// Match persistence failures that triggered a queue rollback
    pub persistence_failures_total: IntCounter,
}

/// Relay-related metrics
#[derive(Clone)]
pub struct RelayMetrics {
    /// Relayed chat messages by outcome (delivered / receiver_offline)
    pub messages_relayed_total: IntCounterVec,

    /// Typing indicators relayed by outcome
    pub typing_relayed_total: IntCounterVec,

    /// Match notifications that found no live connection
    pub notice_misses_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let service_metrics = ServiceMetrics {
            uptime_seconds: IntGauge::new(
                "common_ground_uptime_seconds",
                "Service uptime in seconds",
            )?,
            health_status: IntGauge::new(
                "common_ground_health_status",
                "Health status (0=unhealthy, 1=degraded, 2=healthy)",
            )?,
        };

        let connection_metrics = ConnectionMetrics {
            active_connections: IntGauge::new(
                "common_ground_active_connections",
                "Users with a live connection",
            )?,
            users_waiting: IntGauge::new(
                "common_ground_users_waiting",
                "Users currently in the matching queue",
            )?,
            connections_opened_total: IntCounter::new(
                "common_ground_connections_opened_total",
                "Total connections opened",
            )?,
            connections_closed_total: IntCounter::new(
                "common_ground_connections_closed_total",
                "Total connections closed",
            )?,
        };

        let matching_metrics = MatchingMetrics {
            queue_joins_total: IntCounter::new(
                "common_ground_queue_joins_total",
                "Total queue join requests processed",
            )?,
            matches_formed_total: IntCounter::new(
                "common_ground_matches_formed_total",
                "Total matches formed",
            )?,
            match_score: Histogram::with_opts(
                HistogramOpts::new(
                    "common_ground_match_score",
                    "Distribution of formed match scores",
                )
                .buckets(vec![30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]),
            )?,
            persistence_failures_total: IntCounter::new(
                "common_ground_match_persistence_failures_total",
                "Match persistence failures that rolled the queue back",
            )?,
        };

        let relay_metrics = RelayMetrics {
            messages_relayed_total: IntCounterVec::new(
                Opts::new(
                    "common_ground_messages_relayed_total",
                    "Relayed chat messages by outcome",
                ),
                &["outcome"],
            )?,
            typing_relayed_total: IntCounterVec::new(
                Opts::new(
                    "common_ground_typing_relayed_total",
                    "Typing indicators relayed by outcome",
                ),
                &["outcome"],
            )?,
            notice_misses_total: IntCounter::new(
                "common_ground_notice_misses_total",
                "Match notifications that found no live connection",
            )?,
        };

        registry.register(Box::new(service_metrics.uptime_seconds.clone()))?;
        registry.register(Box::new(service_metrics.health_status.clone()))?;
        registry.register(Box::new(connection_metrics.active_connections.clone()))?;
        registry.register(Box::new(connection_metrics.users_waiting.clone()))?;
        registry.register(Box::new(
            connection_metrics.connections_opened_total.clone(),
        ))?;
        registry.register(Box::new(
            connection_metrics.connections_closed_total.clone(),
        ))?;
        registry.register(Box::new(matching_metrics.queue_joins_total.clone()))?;
        registry.register(Box::new(matching_metrics.matches_formed_total.clone()))?;
        registry.register(Box::new(matching_metrics.match_score.clone()))?;
        registry.register(Box::new(
            matching_metrics.persistence_failures_total.clone(),
        ))?;
        registry.register(Box::new(relay_metrics.messages_relayed_total.clone()))?;
        registry.register(Box::new(relay_metrics.typing_relayed_total.clone()))?;
        registry.register(Box::new(relay_metrics.notice_misses_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            service_metrics,
            connection_metrics,
            matching_metrics,
            relay_metrics,
        })
    }

    /// Get the Prometheus registry for exposition
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Direct access to service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Direct access to connection metrics
    pub fn connection(&self) -> &ConnectionMetrics {
        &self.connection_metrics
    }

    /// Direct access to matching metrics
    pub fn matching(&self) -> &MatchingMetrics {
        &self.matching_metrics
    }

    /// Direct access to relay metrics
    pub fn relay(&self) -> &RelayMetrics {
        &self.relay_metrics
    }

    /// Record a processed queue join
    pub fn record_queue_join(&self) {
        self.matching_metrics.queue_joins_total.inc();
    }

    /// Record a formed match and its score
    pub fn record_match_formed(&self, score: f64) {
        self.matching_metrics.matches_formed_total.inc();
        self.matching_metrics.match_score.observe(score);
    }

    /// Record a match persistence failure (queue rolled back)
    pub fn record_match_persistence_failure(&self) {
        self.matching_metrics.persistence_failures_total.inc();
    }

    /// Record a relayed chat message by delivery outcome
    pub fn record_message_relayed(&self, delivered: bool) {
        let outcome = if delivered {
            "delivered"
        } else {
            "receiver_offline"
        };
        self.relay_metrics
            .messages_relayed_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a relayed typing indicator by delivery outcome
    pub fn record_typing_relayed(&self, delivered: bool) {
        let outcome = if delivered {
            "delivered"
        } else {
            "receiver_offline"
        };
        self.relay_metrics
            .typing_relayed_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a match notification that found no live connection
    pub fn record_notice_miss(&self) {
        self.relay_metrics.notice_misses_total.inc();
    }

    /// Record a connection lifecycle transition
    pub fn record_connection_opened(&self) {
        self.connection_metrics.connections_opened_total.inc();
    }

    pub fn record_connection_closed(&self) {
        self.connection_metrics.connections_closed_total.inc();
    }

    /// Refresh gauges from the matchmaker's current stats
    pub fn update_from_stats(&self, stats: &MatchmakerStats) {
        self.connection_metrics
            .active_connections
            .set(stats.active_connections as i64);
        self.connection_metrics
            .users_waiting
            .set(stats.users_waiting as i64);
    }

    /// Update overall health status gauge
    pub fn update_health_status(&self, status: i64) {
        self.service_metrics.health_status.set(status);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Metric names are compile-time constants; creation only fails on
        // duplicate registration within one registry.
        Self::new().expect("Failed to create metrics collector")
    }
}
