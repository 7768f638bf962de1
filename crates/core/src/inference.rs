//! Per-inference event records, the append-only source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of class labels the metrics care about.
///
/// The model may emit other labels; they are stored verbatim but are neither
/// counted in the class-frequency rollup nor treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictedClass {
    /// Pass label ("OK").
    Ok,
    /// Fail label ("Defect").
    Defect,
    /// Anything else the model produces.
    Other(String),
}

impl PredictedClass {
    pub const PASS_LABEL: &'static str = "OK";
    pub const FAIL_LABEL: &'static str = "Defect";

    pub fn from_label(label: &str) -> Self {
        match label {
            Self::PASS_LABEL => Self::Ok,
            Self::FAIL_LABEL => Self::Defect,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            Self::Ok => Self::PASS_LABEL,
            Self::Defect => Self::FAIL_LABEL,
            Self::Other(label) => label,
        }
    }
}

/// One inference run over one uploaded image.
///
/// Immutable once written; the metrics worker only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Generated identifier (`res_id` column).
    pub id: Uuid,
    /// Public URL of the stored result copy.
    pub result_image_path: String,
    /// Public URL of the raw uploaded image.
    pub raw_image_path: String,
    /// Model version that produced this prediction.
    pub model_version: String,
    /// Predicted class label.
    pub predicted_class: PredictedClass,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    /// Inference latency in milliseconds (unit fixed at the ingestion
    /// boundary, see DESIGN.md).
    pub latency_ms: f64,
    /// Event timestamp, always timezone-aware UTC.
    pub recorded_at: DateTime<Utc>,
}
