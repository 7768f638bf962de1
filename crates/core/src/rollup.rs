//! Weekly rollup computation: per-window aggregate records for the three
//! metric families.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inference::{InferenceResult, PredictedClass};
use crate::stats::StatSummary;
use crate::week::WeekWindow;

/// The three derived metric families, one destination table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricFamily {
    InferenceTime,
    Confidence,
    ClassFrequency,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::InferenceTime,
        MetricFamily::Confidence,
        MetricFamily::ClassFrequency,
    ];

    /// Destination table name (unqualified).
    pub fn table(&self) -> &'static str {
        match self {
            Self::InferenceTime => "inference_metrics",
            Self::Confidence => "confidencescore_metrics",
            Self::ClassFrequency => "prediction_class_metrics",
        }
    }
}

/// Inference-latency statistics for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceTimeRecord {
    pub id: Uuid,
    pub window: WeekWindow,
    pub inserted_at: DateTime<Utc>,
    pub stats: StatSummary,
}

/// Confidence-score statistics for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRecord {
    pub id: Uuid,
    pub window: WeekWindow,
    pub inserted_at: DateTime<Utc>,
    pub stats: StatSummary,
}

/// Pass/fail class counts for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFrequencyRecord {
    pub id: Uuid,
    pub window: WeekWindow,
    pub inserted_at: DateTime<Utc>,
    pub pass_count: u64,
    pub fail_count: u64,
}

/// One aggregate record destined for one of the three tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregateRecord {
    InferenceTime(InferenceTimeRecord),
    Confidence(ConfidenceRecord),
    ClassFrequency(ClassFrequencyRecord),
}

impl AggregateRecord {
    pub fn family(&self) -> MetricFamily {
        match self {
            Self::InferenceTime(_) => MetricFamily::InferenceTime,
            Self::Confidence(_) => MetricFamily::Confidence,
            Self::ClassFrequency(_) => MetricFamily::ClassFrequency,
        }
    }

    pub fn window(&self) -> WeekWindow {
        match self {
            Self::InferenceTime(r) => r.window,
            Self::Confidence(r) => r.window,
            Self::ClassFrequency(r) => r.window,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::InferenceTime(r) => r.id,
            Self::Confidence(r) => r.id,
            Self::ClassFrequency(r) => r.id,
        }
    }
}

/// The three aggregate records for one non-empty window.
///
/// The families are computed from the same row set, so a window either
/// produces all three records or none at all. Empty windows are a signal
/// (`None`), never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyRollup {
    pub inference_time: InferenceTimeRecord,
    pub confidence: ConfidenceRecord,
    pub class_frequency: ClassFrequencyRecord,
}

impl WeeklyRollup {
    /// Computes the rollup over the full in-window population.
    ///
    /// Statistics are recomputed from scratch each run, never incrementally,
    /// so a closed window with unchanged source data always yields identical
    /// field values apart from `produced_at`.
    pub fn compute(
        window: WeekWindow,
        results: &[InferenceResult],
        produced_at: DateTime<Utc>,
    ) -> Option<Self> {
        if results.is_empty() {
            return None;
        }

        let latencies: Vec<f64> = results.iter().map(|r| r.latency_ms).collect();
        let confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();

        // Guarded by the emptiness check above.
        let latency_stats = StatSummary::from_sample(&latencies)?;
        let confidence_stats = StatSummary::from_sample(&confidences)?;

        let pass_count = results
            .iter()
            .filter(|r| r.predicted_class == PredictedClass::Ok)
            .count() as u64;
        let fail_count = results
            .iter()
            .filter(|r| r.predicted_class == PredictedClass::Defect)
            .count() as u64;

        Some(Self {
            inference_time: InferenceTimeRecord {
                id: Uuid::new_v4(),
                window,
                inserted_at: produced_at,
                stats: latency_stats,
            },
            confidence: ConfidenceRecord {
                id: Uuid::new_v4(),
                window,
                inserted_at: produced_at,
                stats: confidence_stats,
            },
            class_frequency: ClassFrequencyRecord {
                id: Uuid::new_v4(),
                window,
                inserted_at: produced_at,
                pass_count,
                fail_count,
            },
        })
    }

    /// Splits the rollup into per-table records for the upsert coordinator.
    pub fn into_records(self) -> [AggregateRecord; 3] {
        [
            AggregateRecord::InferenceTime(self.inference_time),
            AggregateRecord::Confidence(self.confidence),
            AggregateRecord::ClassFrequency(self.class_frequency),
        ]
    }
}
