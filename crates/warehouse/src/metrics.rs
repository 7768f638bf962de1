//! Weekly aggregate table access.
//!
//! Every query is parameterized through `.bind()`; window keys travel as
//! epoch milliseconds and are compared via `fromUnixTimestamp64Milli`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use pipeline_core::{
    AggregateRecord, ClassFrequencyRecord, ConfidenceRecord, Error, InferenceTimeRecord,
    MetricFamily, Result, WeekWindow,
};

use crate::client::Warehouse;
use crate::store::MetricsStore;

/// Row shape of `castwatch.inference_metrics`.
#[derive(Debug, Clone, Row, Serialize)]
pub struct InferenceMetricsRow {
    pub id: String,
    pub inference_time_min: f64,
    pub inference_time_med: f64,
    pub inference_time_mean: f64,
    pub inference_time_max: f64,
    pub insert_datetime: i64,
    pub aggregation_start: i64,
    pub aggregation_end: i64,
}

impl From<&InferenceTimeRecord> for InferenceMetricsRow {
    fn from(r: &InferenceTimeRecord) -> Self {
        Self {
            id: r.id.to_string(),
            inference_time_min: r.stats.min,
            inference_time_med: r.stats.median,
            inference_time_mean: r.stats.mean,
            inference_time_max: r.stats.max,
            insert_datetime: r.inserted_at.timestamp_millis(),
            aggregation_start: r.window.start_ms(),
            aggregation_end: r.window.end_ms(),
        }
    }
}

/// Row shape of `castwatch.confidencescore_metrics`.
#[derive(Debug, Clone, Row, Serialize)]
pub struct ConfidenceMetricsRow {
    pub id: String,
    pub confidence_score_min: f64,
    pub confidence_score_med: f64,
    pub confidence_score_mean: f64,
    pub confidence_score_max: f64,
    pub insert_datetime: i64,
    pub aggregation_start: i64,
    pub aggregation_end: i64,
}

impl From<&ConfidenceRecord> for ConfidenceMetricsRow {
    fn from(r: &ConfidenceRecord) -> Self {
        Self {
            id: r.id.to_string(),
            confidence_score_min: r.stats.min,
            confidence_score_med: r.stats.median,
            confidence_score_mean: r.stats.mean,
            confidence_score_max: r.stats.max,
            insert_datetime: r.inserted_at.timestamp_millis(),
            aggregation_start: r.window.start_ms(),
            aggregation_end: r.window.end_ms(),
        }
    }
}

/// Row shape of `castwatch.prediction_class_metrics`.
#[derive(Debug, Clone, Row, Serialize)]
pub struct ClassMetricsRow {
    pub id: String,
    pub pred_class_pass_freq: u64,
    pub pred_class_fail_freq: u64,
    pub insert_datetime: i64,
    pub aggregation_start: i64,
    pub aggregation_end: i64,
}

impl From<&ClassFrequencyRecord> for ClassMetricsRow {
    fn from(r: &ClassFrequencyRecord) -> Self {
        Self {
            id: r.id.to_string(),
            pred_class_pass_freq: r.pass_count,
            pred_class_fail_freq: r.fail_count,
            insert_datetime: r.inserted_at.timestamp_millis(),
            aggregation_start: r.window.start_ms(),
            aggregation_end: r.window.end_ms(),
        }
    }
}

#[derive(Debug, Row, Deserialize)]
struct WindowRow {
    start_ms: i64,
    end_ms: i64,
}

impl Warehouse {
    async fn insert_inference_time(&self, record: &InferenceTimeRecord) -> Result<()> {
        let row = InferenceMetricsRow::from(record);
        let mut insert = self
            .inner()
            .insert("castwatch.inference_metrics")
            .map_err(|e| Error::warehouse(format!("insert init: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::warehouse(format!("insert write: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::warehouse(format!("insert commit: {}", e)))
    }

    async fn insert_confidence(&self, record: &ConfidenceRecord) -> Result<()> {
        let row = ConfidenceMetricsRow::from(record);
        let mut insert = self
            .inner()
            .insert("castwatch.confidencescore_metrics")
            .map_err(|e| Error::warehouse(format!("insert init: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::warehouse(format!("insert write: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::warehouse(format!("insert commit: {}", e)))
    }

    async fn insert_class_frequency(&self, record: &ClassFrequencyRecord) -> Result<()> {
        let row = ClassMetricsRow::from(record);
        let mut insert = self
            .inner()
            .insert("castwatch.prediction_class_metrics")
            .map_err(|e| Error::warehouse(format!("insert init: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::warehouse(format!("insert write: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::warehouse(format!("insert commit: {}", e)))
    }

    /// In-place field overwrite keyed by window; the id column is left
    /// untouched so the existing row keeps its original identifier.
    async fn update_inference_time(&self, record: &InferenceTimeRecord) -> Result<()> {
        self.inner()
            .query(
                "ALTER TABLE castwatch.inference_metrics UPDATE \
                 inference_time_min = ?, inference_time_med = ?, \
                 inference_time_mean = ?, inference_time_max = ?, \
                 insert_datetime = fromUnixTimestamp64Milli(?) \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)",
            )
            .bind(record.stats.min)
            .bind(record.stats.median)
            .bind(record.stats.mean)
            .bind(record.stats.max)
            .bind(record.inserted_at.timestamp_millis())
            .bind(record.window.start_ms())
            .bind(record.window.end_ms())
            .execute()
            .await
            .map_err(|e| Error::warehouse(format!("inference_metrics update: {}", e)))
    }

    async fn update_confidence(&self, record: &ConfidenceRecord) -> Result<()> {
        self.inner()
            .query(
                "ALTER TABLE castwatch.confidencescore_metrics UPDATE \
                 confidence_score_min = ?, confidence_score_med = ?, \
                 confidence_score_mean = ?, confidence_score_max = ?, \
                 insert_datetime = fromUnixTimestamp64Milli(?) \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)",
            )
            .bind(record.stats.min)
            .bind(record.stats.median)
            .bind(record.stats.mean)
            .bind(record.stats.max)
            .bind(record.inserted_at.timestamp_millis())
            .bind(record.window.start_ms())
            .bind(record.window.end_ms())
            .execute()
            .await
            .map_err(|e| Error::warehouse(format!("confidencescore_metrics update: {}", e)))
    }

    async fn update_class_frequency(&self, record: &ClassFrequencyRecord) -> Result<()> {
        self.inner()
            .query(
                "ALTER TABLE castwatch.prediction_class_metrics UPDATE \
                 pred_class_pass_freq = ?, pred_class_fail_freq = ?, \
                 insert_datetime = fromUnixTimestamp64Milli(?) \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)",
            )
            .bind(record.pass_count)
            .bind(record.fail_count)
            .bind(record.inserted_at.timestamp_millis())
            .bind(record.window.start_ms())
            .bind(record.window.end_ms())
            .execute()
            .await
            .map_err(|e| Error::warehouse(format!("prediction_class_metrics update: {}", e)))
    }

    fn existing_windows_query(family: MetricFamily) -> &'static str {
        match family {
            MetricFamily::InferenceTime => {
                "SELECT DISTINCT toUnixTimestamp64Milli(aggregation_start) AS start_ms, \
                 toUnixTimestamp64Milli(aggregation_end) AS end_ms \
                 FROM castwatch.inference_metrics \
                 WHERE aggregation_start >= fromUnixTimestamp64Milli(?)"
            }
            MetricFamily::Confidence => {
                "SELECT DISTINCT toUnixTimestamp64Milli(aggregation_start) AS start_ms, \
                 toUnixTimestamp64Milli(aggregation_end) AS end_ms \
                 FROM castwatch.confidencescore_metrics \
                 WHERE aggregation_start >= fromUnixTimestamp64Milli(?)"
            }
            MetricFamily::ClassFrequency => {
                "SELECT DISTINCT toUnixTimestamp64Milli(aggregation_start) AS start_ms, \
                 toUnixTimestamp64Milli(aggregation_end) AS end_ms \
                 FROM castwatch.prediction_class_metrics \
                 WHERE aggregation_start >= fromUnixTimestamp64Milli(?)"
            }
        }
    }

    fn window_exists_query(family: MetricFamily) -> &'static str {
        match family {
            MetricFamily::InferenceTime => {
                "SELECT count() FROM castwatch.inference_metrics \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)"
            }
            MetricFamily::Confidence => {
                "SELECT count() FROM castwatch.confidencescore_metrics \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)"
            }
            MetricFamily::ClassFrequency => {
                "SELECT count() FROM castwatch.prediction_class_metrics \
                 WHERE aggregation_start = fromUnixTimestamp64Milli(?) \
                   AND aggregation_end = fromUnixTimestamp64Milli(?)"
            }
        }
    }
}

#[async_trait]
impl MetricsStore for Warehouse {
    async fn existing_windows(
        &self,
        family: MetricFamily,
        floor: DateTime<Utc>,
    ) -> Result<HashSet<WeekWindow>> {
        let rows: Vec<WindowRow> = self
            .inner()
            .query(Self::existing_windows_query(family))
            .bind(floor.timestamp_millis())
            .fetch_all()
            .await
            .map_err(|e| Error::warehouse(format!("{} range query: {}", family.table(), e)))?;

        let mut windows = HashSet::with_capacity(rows.len());
        for row in rows {
            match WeekWindow::from_millis(row.start_ms, row.end_ms) {
                Some(window) => {
                    windows.insert(window);
                }
                None => warn!(
                    table = family.table(),
                    start_ms = row.start_ms,
                    end_ms = row.end_ms,
                    "Skipping aggregate row with out-of-range window"
                ),
            }
        }

        debug!(table = family.table(), windows = windows.len(), "Loaded existing windows");
        Ok(windows)
    }

    async fn window_exists(&self, family: MetricFamily, window: WeekWindow) -> Result<bool> {
        let count: u64 = self
            .inner()
            .query(Self::window_exists_query(family))
            .bind(window.start_ms())
            .bind(window.end_ms())
            .fetch_one()
            .await
            .map_err(|e| Error::warehouse(format!("{} existence check: {}", family.table(), e)))?;
        Ok(count > 0)
    }

    async fn insert_aggregate(&self, record: &AggregateRecord) -> Result<()> {
        match record {
            AggregateRecord::InferenceTime(r) => self.insert_inference_time(r).await,
            AggregateRecord::Confidence(r) => self.insert_confidence(r).await,
            AggregateRecord::ClassFrequency(r) => self.insert_class_frequency(r).await,
        }
    }

    async fn update_aggregate(&self, record: &AggregateRecord) -> Result<()> {
        match record {
            AggregateRecord::InferenceTime(r) => self.update_inference_time(r).await,
            AggregateRecord::Confidence(r) => self.update_confidence(r).await,
            AggregateRecord::ClassFrequency(r) => self.update_class_frequency(r).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::StatSummary;
    use uuid::Uuid;

    #[test]
    fn test_inference_row_carries_window_keys() {
        let window = WeekWindow::from_millis(1_000, 2_000).unwrap();
        let record = InferenceTimeRecord {
            id: Uuid::new_v4(),
            window,
            inserted_at: Utc::now(),
            stats: StatSummary { min: 1.0, median: 2.0, mean: 2.5, max: 4.0 },
        };
        let row = InferenceMetricsRow::from(&record);
        assert_eq!(row.aggregation_start, 1_000);
        assert_eq!(row.aggregation_end, 2_000);
        assert_eq!(row.inference_time_med, 2.0);
    }

    #[test]
    fn test_queries_are_parameterized() {
        // No value ever lands in the SQL text itself.
        for family in MetricFamily::ALL {
            assert!(Warehouse::existing_windows_query(family).contains('?'));
            assert!(Warehouse::window_exists_query(family).contains('?'));
        }
    }
}
