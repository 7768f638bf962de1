//! Internal telemetry for the castwatch pipeline.
//!
//! No external metrics system: counters live in-process and the scheduler
//! logs a summary on an interval.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
