//! Background workers for the castwatch pipeline.
//!
//! Two paths:
//! - Listener (real-time): upload notification -> retrieve image ->
//!   classify -> store result copy -> append one result row.
//! - Metrics (batch): trigger signal -> weekly rollup of the result table
//!   into three aggregate tables, insert-or-update keyed by week window.

pub mod listener;
pub mod metrics;
pub mod scheduler;

pub use listener::InferenceListener;
pub use metrics::{MetricsWorker, RunSummary, WeekState};
pub use scheduler::{WorkerConfig, WorkerScheduler};
