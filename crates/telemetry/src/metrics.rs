//! In-process pipeline counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for both pipeline paths.
#[derive(Debug, Default)]
pub struct Metrics {
    // Listener (real-time) path
    pub notifications_received: Counter,
    pub images_classified: Counter,
    pub listener_failures: Counter,
    pub results_inserted: Counter,

    // Metrics (batch) path
    pub rollup_runs: Counter,
    pub rollup_run_failures: Counter,
    pub weeks_scanned: Counter,
    pub weeks_skipped: Counter,
    pub weeks_empty: Counter,
    pub aggregates_inserted: Counter,
    pub aggregates_updated: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            notifications_received: self.notifications_received.get(),
            images_classified: self.images_classified.get(),
            listener_failures: self.listener_failures.get(),
            results_inserted: self.results_inserted.get(),
            rollup_runs: self.rollup_runs.get(),
            rollup_run_failures: self.rollup_run_failures.get(),
            weeks_scanned: self.weeks_scanned.get(),
            weeks_skipped: self.weeks_skipped.get(),
            weeks_empty: self.weeks_empty.get(),
            aggregates_inserted: self.aggregates_inserted.get(),
            aggregates_updated: self.aggregates_updated.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub notifications_received: u64,
    pub images_classified: u64,
    pub listener_failures: u64,
    pub results_inserted: u64,
    pub rollup_runs: u64,
    pub rollup_run_failures: u64,
    pub weeks_scanned: u64,
    pub weeks_skipped: u64,
    pub weeks_empty: u64,
    pub aggregates_inserted: u64,
    pub aggregates_updated: u64,
}

impl MetricsSnapshot {
    /// Logs the snapshot as one structured line.
    pub fn log(&self) {
        tracing::info!(
            notifications_received = self.notifications_received,
            images_classified = self.images_classified,
            listener_failures = self.listener_failures,
            results_inserted = self.results_inserted,
            rollup_runs = self.rollup_runs,
            rollup_run_failures = self.rollup_run_failures,
            weeks_scanned = self.weeks_scanned,
            weeks_skipped = self.weeks_skipped,
            weeks_empty = self.weeks_empty,
            aggregates_inserted = self.aggregates_inserted,
            aggregates_updated = self.aggregates_updated,
            "Pipeline metrics"
        );
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
