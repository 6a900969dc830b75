//! Metrics and monitoring for the common-ground matchmaking service
//!
//! This module provides metrics collection and performance tracking for the
//! matchmaking service, exposed through the main server's /metrics endpoint.

pub mod collector;

pub use collector::{
    ConnectionMetrics, MatchingMetrics, MetricsCollector, RelayMetrics, ServiceMetrics,
};
