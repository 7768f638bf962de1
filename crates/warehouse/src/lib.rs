//! ClickHouse warehouse access for castwatch.
//!
//! The worker crates never touch the `clickhouse` client directly; they go
//! through the [`ResultsStore`] and [`MetricsStore`] traits, which keeps the
//! aggregation engine testable against in-memory implementations.

pub mod client;
pub mod config;
pub mod health;
pub mod metrics;
pub mod results;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use store::{MetricsStore, ResultsStore};
