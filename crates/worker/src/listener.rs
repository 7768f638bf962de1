//! Inference listener: the real-time path.
//!
//! For each upload notification: retrieve the image, ask the model for a
//! prediction, store a result copy, append one immutable result row.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use blobstore::ObjectStore;
use pipeline_core::{InferenceResult, PredictedClass, Result};
use pubsub::UploadNotification;
use telemetry::metrics;
use vision::Classifier;
use warehouse::ResultsStore;

/// Prefix under which result copies are stored in the image bucket.
pub const RESULT_PREFIX: &str = "result/";

/// Processes upload notifications into inference result rows.
pub struct InferenceListener {
    storage: Arc<dyn ObjectStore>,
    classifier: Arc<dyn Classifier>,
    results: Arc<dyn ResultsStore>,
}

impl InferenceListener {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        classifier: Arc<dyn Classifier>,
        results: Arc<dyn ResultsStore>,
    ) -> Self {
        Self {
            storage,
            classifier,
            results,
        }
    }

    /// Handles one notification end to end and returns the recorded row.
    pub async fn handle(&self, notification: &UploadNotification) -> Result<InferenceResult> {
        let image = self
            .storage
            .retrieve(&notification.bucket, &notification.object)
            .await?;

        let classification = self.classifier.classify(image.clone()).await?;

        let result_object = format!("{}{}", RESULT_PREFIX, notification.file_name());
        let result_image_path = self
            .storage
            .store(&notification.bucket, &result_object, image)
            .await?;

        let result = InferenceResult {
            id: Uuid::new_v4(),
            result_image_path,
            raw_image_path: self
                .storage
                .object_url(&notification.bucket, &notification.object),
            model_version: self.classifier.model_version().to_string(),
            predicted_class: PredictedClass::from_label(&classification.label),
            confidence: classification.confidence,
            latency_ms: classification.latency_ms,
            recorded_at: Utc::now(),
        };

        self.results.insert_result(&result).await?;
        metrics().images_classified.inc();
        metrics().results_inserted.inc();

        info!(
            res_id = %result.id,
            object = %notification.object,
            class = result.predicted_class.as_label(),
            confidence = result.confidence,
            latency_ms = result.latency_ms,
            "Recorded inference result"
        );
        Ok(result)
    }

    /// Processes a fetched batch of raw payloads.
    ///
    /// A malformed or failing notification is logged and skipped; it must
    /// not poison the rest of the batch. Returns the number processed
    /// successfully.
    pub async fn process_batch(&self, payloads: &[Vec<u8>]) -> usize {
        let mut processed = 0;

        for payload in payloads {
            metrics().notifications_received.inc();

            let notification = match UploadNotification::from_payload(payload) {
                Ok(n) => n,
                Err(e) => {
                    metrics().listener_failures.inc();
                    error!("Dropping malformed upload notification: {}", e);
                    continue;
                }
            };

            match self.handle(&notification).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    metrics().listener_failures.inc();
                    error!(
                        bucket = %notification.bucket,
                        object = %notification.object,
                        "Failed to process upload: {}",
                        e
                    );
                }
            }
        }

        processed
    }
}
