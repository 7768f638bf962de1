//! Weekly metrics worker: the aggregation/upsert engine.
//!
//! One run walks every week from the oldest result row to now, in ascending
//! order, and brings the three aggregate tables up to date:
//!
//! 1. derive the week windows from the earliest result timestamp and a "now"
//!    captured once at run start;
//! 2. load the windows already aggregated in each destination table
//!    (range-diff floor = first derived window);
//! 3. skip closed weeks present in all three tables; always reprocess the
//!    current week; recompute anything missing anywhere, all three families
//!    together;
//! 4. per record, insert if the window is absent from its table, otherwise
//!    update the existing row in place (the row keeps its original id).
//!
//! Errors fail the run fast; the next trigger re-derives all state from the
//! warehouse, which makes a run idempotent without transactions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use pipeline_core::{MetricFamily, ReferenceZone, Result, WeekWindow, WeeklyRollup};
use telemetry::metrics;
use warehouse::{MetricsStore, ResultsStore};

/// Per-week disposition, decided before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekState {
    /// Absent from at least one aggregate table.
    Missing,
    /// The window containing "now"; incomplete by definition, always
    /// reprocessed even when all three tables already have a row.
    StaleCurrent,
    /// Closed week present in all three tables; nothing to do.
    PresentComplete,
}

/// Classifies one week against the run's captured "now" and the
/// existing-range index.
pub fn classify_week(
    window: WeekWindow,
    now: DateTime<Utc>,
    missing_somewhere: bool,
) -> WeekState {
    if window.contains(now) {
        WeekState::StaleCurrent
    } else if missing_somewhere {
        WeekState::Missing
    } else {
        WeekState::PresentComplete
    }
}

/// Windows already aggregated, per destination table.
#[derive(Debug, Default)]
pub struct ExistingRanges {
    inference_time: HashSet<WeekWindow>,
    confidence: HashSet<WeekWindow>,
    class_frequency: HashSet<WeekWindow>,
}

impl ExistingRanges {
    /// Loads the index from all three tables with `start >= floor`.
    pub async fn load(store: &dyn MetricsStore, floor: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            inference_time: store
                .existing_windows(MetricFamily::InferenceTime, floor)
                .await?,
            confidence: store
                .existing_windows(MetricFamily::Confidence, floor)
                .await?,
            class_frequency: store
                .existing_windows(MetricFamily::ClassFrequency, floor)
                .await?,
        })
    }

    fn set(&self, family: MetricFamily) -> &HashSet<WeekWindow> {
        match family {
            MetricFamily::InferenceTime => &self.inference_time,
            MetricFamily::Confidence => &self.confidence,
            MetricFamily::ClassFrequency => &self.class_frequency,
        }
    }

    /// True when the window is absent from any table: partial presence
    /// counts as missing, so all three families get recomputed together.
    pub fn is_week_missing(&self, window: WeekWindow) -> bool {
        MetricFamily::ALL
            .iter()
            .any(|family| !self.set(*family).contains(&window))
    }

    #[cfg(test)]
    fn with_window(mut self, family: MetricFamily, window: WeekWindow) -> Self {
        match family {
            MetricFamily::InferenceTime => self.inference_time.insert(window),
            MetricFamily::Confidence => self.confidence.insert(window),
            MetricFamily::ClassFrequency => self.class_frequency.insert(window),
        };
        self
    }
}

/// Totals for one metrics run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub weeks_scanned: u64,
    pub weeks_skipped: u64,
    pub weeks_empty: u64,
    pub records_inserted: u64,
    pub records_updated: u64,
}

/// The weekly metrics worker.
pub struct MetricsWorker {
    results: Arc<dyn ResultsStore>,
    store: Arc<dyn MetricsStore>,
    zone: ReferenceZone,
}

impl MetricsWorker {
    pub fn new(
        results: Arc<dyn ResultsStore>,
        store: Arc<dyn MetricsStore>,
        zone: ReferenceZone,
    ) -> Self {
        Self {
            results,
            store,
            zone,
        }
    }

    /// Runs one aggregation pass against the current wall clock.
    pub async fn run(&self) -> Result<RunSummary> {
        metrics().rollup_runs.inc();
        match self.run_at(Utc::now()).await {
            Ok(summary) => {
                metrics().weeks_scanned.inc_by(summary.weeks_scanned);
                metrics().weeks_skipped.inc_by(summary.weeks_skipped);
                metrics().weeks_empty.inc_by(summary.weeks_empty);
                metrics().aggregates_inserted.inc_by(summary.records_inserted);
                metrics().aggregates_updated.inc_by(summary.records_updated);
                Ok(summary)
            }
            Err(e) => {
                metrics().rollup_run_failures.inc();
                Err(e)
            }
        }
    }

    /// Runs one aggregation pass with an explicit "now" (captured once, so
    /// the current-week decision is stable across the whole run).
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let Some(earliest) = self.results.earliest_result_at().await? else {
            info!("No inference results yet; nothing to aggregate");
            return Ok(RunSummary::default());
        };

        let floor = self.zone.week_start(earliest);
        let index = ExistingRanges::load(self.store.as_ref(), floor).await?;

        let mut summary = RunSummary::default();

        for window in self.zone.week_ranges(earliest, now) {
            summary.weeks_scanned += 1;

            let state = classify_week(window, now, index.is_week_missing(window));
            if state == WeekState::PresentComplete {
                debug!(window = %window, "Week already aggregated in all tables; skipping");
                summary.weeks_skipped += 1;
                continue;
            }

            let rows = self.results.results_in_window(window).await?;
            let Some(rollup) = WeeklyRollup::compute(window, &rows, Utc::now()) else {
                debug!(window = %window, "No data for this week; skipping");
                summary.weeks_empty += 1;
                continue;
            };

            info!(
                window = %window,
                rows = rows.len(),
                current_week = state == WeekState::StaleCurrent,
                "Aggregating week"
            );

            for record in rollup.into_records() {
                if self.store.window_exists(record.family(), window).await? {
                    self.store.update_aggregate(&record).await?;
                    summary.records_updated += 1;
                } else {
                    self.store.insert_aggregate(&record).await?;
                    summary.records_inserted += 1;
                }
            }
        }

        info!(
            weeks_scanned = summary.weeks_scanned,
            weeks_skipped = summary.weeks_skipped,
            weeks_empty = summary.weeks_empty,
            records_inserted = summary.records_inserted,
            records_updated = summary.records_updated,
            "Metrics run complete"
        );
        Ok(summary)
    }
}
