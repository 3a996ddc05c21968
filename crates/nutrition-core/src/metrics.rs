//! Metrics for the nutrition sync service
//!
//! Records through the `metrics` facade; whichever recorder the binary
//! installs receives them.

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Metric names as constants for consistency
pub mod names {
    // Store metrics
    pub const STORE_OPERATIONS_TOTAL: &str = "nutrition_store_operations_total";

    // Sync metrics
    pub const SYNC_OPERATIONS_TOTAL: &str = "nutrition_sync_operations_total";
    pub const SYNC_INDEX_TOTAL: &str = "nutrition_sync_index_total";
    pub const SYNC_LATENCY: &str = "nutrition_sync_latency_seconds";

    // Search metrics
    pub const SEARCH_REQUESTS_TOTAL: &str = "nutrition_search_requests_total";
    pub const SEARCH_HITS: &str = "nutrition_search_hits";

    // Connection metrics
    pub const CONNECTION_STATE: &str = "connection_state";
}

/// Labels for metrics
pub mod labels {
    pub const COMPONENT: &str = "component";
    pub const OPERATION: &str = "operation";
    pub const OUTCOME: &str = "outcome";
    pub const CONNECTION: &str = "connection";
}

/// Store metrics
#[derive(Clone)]
pub struct StoreMetrics {
    component: String,
}

impl StoreMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Record a store call and whether it succeeded
    pub fn record_operation(&self, operation: &'static str, ok: bool) {
        counter!(
            names::STORE_OPERATIONS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::OPERATION => operation,
            labels::OUTCOME => if ok { "ok" } else { "error" },
        )
        .increment(1);
    }
}

/// Orchestrator metrics
#[derive(Clone)]
pub struct SyncMetrics {
    component: String,
}

impl SyncMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Record the caller-visible outcome of a mutation
    pub fn record_operation(&self, operation: &'static str, outcome: &'static str) {
        counter!(
            names::SYNC_OPERATIONS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::OPERATION => operation,
            labels::OUTCOME => outcome,
        )
        .increment(1);
    }

    /// Record the mirror step outcome (synced, failed, skipped, unreachable)
    pub fn record_index(&self, operation: &'static str, outcome: &'static str) {
        counter!(
            names::SYNC_INDEX_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::OPERATION => operation,
            labels::OUTCOME => outcome,
        )
        .increment(1);
    }

    /// Record end-to-end mutation latency
    pub fn record_latency(&self, operation: &'static str, duration: Duration) {
        histogram!(
            names::SYNC_LATENCY,
            labels::COMPONENT => self.component.clone(),
            labels::OPERATION => operation,
        )
        .record(duration.as_secs_f64());
    }
}

/// Search metrics
#[derive(Clone)]
pub struct SearchMetrics {
    component: String,
}

impl SearchMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Record a search and the number of documents it returned
    pub fn record_search(&self, outcome: &'static str, hits: usize) {
        counter!(
            names::SEARCH_REQUESTS_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::OUTCOME => outcome,
        )
        .increment(1);
        histogram!(
            names::SEARCH_HITS,
            labels::COMPONENT => self.component.clone(),
        )
        .record(hits as f64);
    }
}

/// Connection metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    connection_name: String,
}

impl ConnectionMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            connection_name: name.into(),
        }
    }

    /// Set connection state (1 = reachable, 0 = unreachable)
    pub fn set_connected(&self, connected: bool) {
        gauge!(
            names::CONNECTION_STATE,
            labels::CONNECTION => self.connection_name.clone(),
        )
        .set(if connected { 1.0 } else { 0.0 });
    }
}

/// Timer guard for automatic latency recording
pub struct LatencyTimer<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> LatencyTimer<F>
where
    F: FnOnce(Duration),
{
    /// Start a new timer
    pub fn start(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }
}

impl<F> Drop for LatencyTimer<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}
