//! Inference results table access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use pipeline_core::{Error, InferenceResult, PredictedClass, Result, WeekWindow};

use crate::client::Warehouse;
use crate::store::ResultsStore;

/// Row shape of `castwatch.inference_results`.
///
/// Timestamps travel as epoch milliseconds; conversion to `DateTime<Utc>`
/// happens exactly once, here at the warehouse boundary.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ResultRow {
    pub res_id: String,
    pub res_image_path: String,
    pub raw_image_path: String,
    pub model_ver: String,
    pub pred_class: String,
    pub pred_confidence: f64,
    pub pred_speed_ms: f64,
    /// Epoch milliseconds (DateTime64(3) column).
    pub res_insert_datetime: i64,
}

impl From<&InferenceResult> for ResultRow {
    fn from(result: &InferenceResult) -> Self {
        Self {
            res_id: result.id.to_string(),
            res_image_path: result.result_image_path.clone(),
            raw_image_path: result.raw_image_path.clone(),
            model_ver: result.model_version.clone(),
            pred_class: result.predicted_class.as_label().to_string(),
            pred_confidence: result.confidence,
            pred_speed_ms: result.latency_ms,
            res_insert_datetime: result.recorded_at.timestamp_millis(),
        }
    }
}

impl ResultRow {
    /// Converts a fetched row back into the domain record.
    pub fn into_domain(self) -> Result<InferenceResult> {
        let id = Uuid::parse_str(&self.res_id)
            .map_err(|e| Error::warehouse(format!("invalid res_id {}: {}", self.res_id, e)))?;
        let recorded_at = DateTime::from_timestamp_millis(self.res_insert_datetime)
            .ok_or_else(|| {
                Error::warehouse(format!(
                    "res_insert_datetime out of range: {}",
                    self.res_insert_datetime
                ))
            })?;

        Ok(InferenceResult {
            id,
            result_image_path: self.res_image_path,
            raw_image_path: self.raw_image_path,
            model_version: self.model_ver,
            predicted_class: PredictedClass::from_label(&self.pred_class),
            confidence: self.pred_confidence,
            latency_ms: self.pred_speed_ms,
            recorded_at,
        })
    }
}

#[derive(Debug, Row, Deserialize)]
struct EarliestRow {
    total: u64,
    min_ms: i64,
}

#[async_trait]
impl ResultsStore for Warehouse {
    async fn earliest_result_at(&self) -> Result<Option<DateTime<Utc>>> {
        // min() over an empty table yields the column default, so the count
        // decides whether the minimum is real.
        let row: EarliestRow = self
            .inner()
            .query(
                "SELECT count() AS total, \
                 toUnixTimestamp64Milli(min(res_insert_datetime)) AS min_ms \
                 FROM castwatch.inference_results",
            )
            .fetch_one()
            .await
            .map_err(|e| Error::warehouse(format!("earliest-result query: {}", e)))?;

        if row.total == 0 {
            return Ok(None);
        }

        let earliest = DateTime::from_timestamp_millis(row.min_ms).ok_or_else(|| {
            Error::warehouse(format!("min res_insert_datetime out of range: {}", row.min_ms))
        })?;
        Ok(Some(earliest))
    }

    async fn results_in_window(&self, window: WeekWindow) -> Result<Vec<InferenceResult>> {
        let rows: Vec<ResultRow> = self
            .inner()
            .query(
                "SELECT res_id, res_image_path, raw_image_path, model_ver, pred_class, \
                 pred_confidence, pred_speed_ms, \
                 toUnixTimestamp64Milli(res_insert_datetime) AS res_insert_datetime \
                 FROM castwatch.inference_results \
                 WHERE res_insert_datetime >= fromUnixTimestamp64Milli(?) \
                   AND res_insert_datetime < fromUnixTimestamp64Milli(?) \
                 ORDER BY res_insert_datetime",
            )
            .bind(window.start_ms())
            .bind(window.end_ms())
            .fetch_all()
            .await
            .map_err(|e| Error::warehouse(format!("window query {}: {}", window, e)))?;

        debug!(window = %window, rows = rows.len(), "Fetched result rows");

        rows.into_iter().map(ResultRow::into_domain).collect()
    }

    async fn insert_result(&self, result: &InferenceResult) -> Result<()> {
        let row = ResultRow::from(result);
        let mut insert = self
            .inner()
            .insert("castwatch.inference_results")
            .map_err(|e| Error::warehouse(format!("insert init: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::warehouse(format!("insert write: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::warehouse(format!("insert commit: {}", e)))?;

        debug!(res_id = %result.id, class = result.predicted_class.as_label(), "Inserted inference result");
        Ok(())
    }
}
