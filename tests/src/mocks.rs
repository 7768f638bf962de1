//! Mock implementations for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use blobstore::ObjectStore;
use pipeline_core::{
    AggregateRecord, Error, InferenceResult, MetricFamily, Result, WeekWindow,
};
use vision::{Classification, Classifier};
use warehouse::{MetricsStore, ResultsStore};

/// In-memory results store.
///
/// Implements the same `ResultsStore` trait as the warehouse client, so the
/// listener and the metrics worker run their full production code paths
/// without a ClickHouse instance.
#[derive(Clone, Default)]
pub struct InMemoryResultsStore {
    rows: Arc<Mutex<Vec<InferenceResult>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl InMemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored result rows.
    pub fn rows(&self) -> Vec<InferenceResult> {
        self.rows.lock().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    /// Seed a row directly, bypassing the listener.
    pub fn seed(&self, result: InferenceResult) {
        self.rows.lock().push(result);
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check_failure(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::warehouse("mock results store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResultsStore for InMemoryResultsStore {
    async fn earliest_result_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.check_failure()?;
        Ok(self.rows.lock().iter().map(|r| r.recorded_at).min())
    }

    async fn results_in_window(&self, window: WeekWindow) -> Result<Vec<InferenceResult>> {
        self.check_failure()?;
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| window.contains(r.recorded_at))
            .cloned()
            .collect())
    }

    async fn insert_result(&self, result: &InferenceResult) -> Result<()> {
        self.check_failure()?;
        self.rows.lock().push(result.clone());
        Ok(())
    }
}

/// In-memory aggregate store with the warehouse upsert semantics: inserts
/// append a row, updates rewrite every field except the row id.
#[derive(Clone, Default)]
pub struct InMemoryMetricsStore {
    tables: Arc<Mutex<HashMap<MetricFamily, Vec<AggregateRecord>>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows in one family's table, in insertion order.
    pub fn rows(&self, family: MetricFamily) -> Vec<AggregateRecord> {
        self.tables
            .lock()
            .get(&family)
            .cloned()
            .unwrap_or_default()
    }

    /// The rows in one family's table for one window (should be at most one).
    pub fn rows_for_window(
        &self,
        family: MetricFamily,
        window: WeekWindow,
    ) -> Vec<AggregateRecord> {
        self.rows(family)
            .into_iter()
            .filter(|r| r.window() == window)
            .collect()
    }

    /// Total rows across all three tables.
    pub fn total_rows(&self) -> usize {
        MetricFamily::ALL.iter().map(|f| self.rows(*f).len()).sum()
    }

    /// Drop one window's row from one table, simulating a partially
    /// populated warehouse.
    pub fn remove_window(&self, family: MetricFamily, window: WeekWindow) {
        if let Some(rows) = self.tables.lock().get_mut(&family) {
            rows.retain(|r| r.window() != window);
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check_failure(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::warehouse("mock metrics store failure"));
        }
        Ok(())
    }
}

/// Replaces every field of `existing` with `incoming` except the row id,
/// mirroring the warehouse UPDATE which never touches the key or the id.
fn apply_update(existing: &mut AggregateRecord, incoming: &AggregateRecord) {
    let kept_id = existing.id();
    let mut updated = incoming.clone();
    match &mut updated {
        AggregateRecord::InferenceTime(r) => r.id = kept_id,
        AggregateRecord::Confidence(r) => r.id = kept_id,
        AggregateRecord::ClassFrequency(r) => r.id = kept_id,
    }
    *existing = updated;
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn existing_windows(
        &self,
        family: MetricFamily,
        floor: DateTime<Utc>,
    ) -> Result<HashSet<WeekWindow>> {
        self.check_failure()?;
        Ok(self
            .rows(family)
            .into_iter()
            .map(|r| r.window())
            .filter(|w| w.start >= floor)
            .collect())
    }

    async fn window_exists(&self, family: MetricFamily, window: WeekWindow) -> Result<bool> {
        self.check_failure()?;
        Ok(self.rows(family).iter().any(|r| r.window() == window))
    }

    async fn insert_aggregate(&self, record: &AggregateRecord) -> Result<()> {
        self.check_failure()?;
        self.tables
            .lock()
            .entry(record.family())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn update_aggregate(&self, record: &AggregateRecord) -> Result<()> {
        self.check_failure()?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(record.family()).or_default();
        let existing = rows
            .iter_mut()
            .find(|r| r.window() == record.window())
            .ok_or_else(|| Error::warehouse("update for a window with no existing row"))?;
        apply_update(existing, record);
        Ok(())
    }
}

/// In-memory object store addressed as `mem://bucket/object`.
#[derive(Clone, Default)]
pub struct MockObjectStore {
    objects: Arc<Mutex<HashMap<(String, String), Bytes>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, object: &str, data: Bytes) {
        self.objects
            .lock()
            .insert((bucket.to_string(), object.to_string()), data);
    }

    pub fn get(&self, bucket: &str, object: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), object.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn store(&self, bucket: &str, object: &str, data: Bytes) -> Result<String> {
        self.put(bucket, object, data);
        Ok(self.object_url(bucket, object))
    }

    async fn retrieve(&self, bucket: &str, object: &str) -> Result<Bytes> {
        self.get(bucket, object)
            .ok_or_else(|| Error::object_not_found(bucket, object))
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("mem://{}/{}", bucket, object)
    }
}

/// Classifier returning a fixed prediction.
#[derive(Clone)]
pub struct MockClassifier {
    label: String,
    confidence: f64,
    latency_ms: f64,
    calls: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockClassifier {
    pub fn new(label: &str, confidence: f64, latency_ms: f64) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            latency_ms,
            calls: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _image: Bytes) -> Result<Classification> {
        *self.calls.lock() += 1;
        if *self.should_fail.lock() {
            return Err(Error::classifier("mock classifier failure"));
        }
        Ok(Classification {
            label: self.label.clone(),
            confidence: self.confidence,
            latency_ms: self.latency_ms,
        })
    }

    fn model_version(&self) -> &str {
        "mock-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_results_store_window_filter() {
        let store = InMemoryResultsStore::new();
        assert!(store.earliest_result_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metrics_store_update_requires_existing_row() {
        use chrono::TimeZone;
        use pipeline_core::ReferenceZone;

        let store = InMemoryMetricsStore::new();
        let window = ReferenceZone::default()
            .window_of(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        let record = AggregateRecord::ClassFrequency(pipeline_core::ClassFrequencyRecord {
            id: uuid::Uuid::new_v4(),
            window,
            inserted_at: Utc::now(),
            pass_count: 1,
            fail_count: 0,
        });
        assert!(store.update_aggregate(&record).await.is_err());
        store.insert_aggregate(&record).await.unwrap();
        assert!(store.update_aggregate(&record).await.is_ok());
    }
}
