//! Store traits: the seams between the workers and the warehouse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use pipeline_core::{AggregateRecord, InferenceResult, MetricFamily, Result, WeekWindow};

/// Read/write access to the append-only inference results table.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Timestamp of the oldest result row, or `None` when the table is empty.
    async fn earliest_result_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// All result rows with timestamp in `[window.start, window.end)`.
    async fn results_in_window(&self, window: WeekWindow) -> Result<Vec<InferenceResult>>;

    /// Appends one result row.
    async fn insert_result(&self, result: &InferenceResult) -> Result<()>;
}

/// Access to the three weekly aggregate tables.
///
/// The warehouse enforces no uniqueness on `(aggregation_start,
/// aggregation_end)`; callers must check existence before inserting.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Distinct windows already present in one family's table with
    /// `aggregation_start >= floor`. An empty table yields an empty set.
    async fn existing_windows(
        &self,
        family: MetricFamily,
        floor: DateTime<Utc>,
    ) -> Result<HashSet<WeekWindow>>;

    /// True if a row for this exact window exists in the family's table.
    async fn window_exists(&self, family: MetricFamily, window: WeekWindow) -> Result<bool>;

    /// Inserts a new aggregate row (the generated id stands).
    async fn insert_aggregate(&self, record: &AggregateRecord) -> Result<()>;

    /// Overwrites the non-key fields of the existing row matching the
    /// record's window. The existing row keeps its original id.
    async fn update_aggregate(&self, record: &AggregateRecord) -> Result<()>;
}
