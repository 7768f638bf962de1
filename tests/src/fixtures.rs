//! Test fixtures and result-row generators.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use pipeline_core::{InferenceResult, PredictedClass};

/// A fixed instant inside an otherwise unremarkable week (Sunday 2024-06-02
/// in the UTC+8 reporting zone).
pub fn base_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap()
}

/// Generate a result row recorded at `at`.
pub fn inference_result(class: &str, confidence: f64, latency_ms: f64, at: DateTime<Utc>) -> InferenceResult {
    InferenceResult {
        id: Uuid::new_v4(),
        result_image_path: "mem://casting-images/result/cast.jpg".to_string(),
        raw_image_path: "mem://casting-images/cast.jpg".to_string(),
        model_version: "mock-v1".to_string(),
        predicted_class: PredictedClass::from_label(class),
        confidence,
        latency_ms,
        recorded_at: at,
    }
}

/// Generate a passing result row.
pub fn passing_result(at: DateTime<Utc>) -> InferenceResult {
    inference_result("OK", 0.95, 40.0, at)
}

/// Generate a failing result row.
pub fn failing_result(at: DateTime<Utc>) -> InferenceResult {
    inference_result("Defect", 0.40, 60.0, at)
}

/// Generate an upload notification payload as the bus would deliver it.
pub fn upload_payload(bucket: &str, object: &str) -> Vec<u8> {
    serde_json::json!({ "bucket": bucket, "name": object })
        .to_string()
        .into_bytes()
}
