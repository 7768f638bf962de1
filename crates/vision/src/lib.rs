//! Image classification capability.
//!
//! Inference is delegated entirely to a pretrained model behind a model
//! server; this crate only owns the HTTP contract and the unit conversion:
//! whatever per-stage timings the server reports are collapsed into one
//! latency figure in milliseconds before anything leaves this crate.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use pipeline_core::{Error, Result};

/// One prediction for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Predicted class label, verbatim from the model.
    pub label: String,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    /// Total elapsed model time in milliseconds.
    pub latency_ms: f64,
}

/// Image classification capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifies one image.
    async fn classify(&self, image: Bytes) -> Result<Classification>;

    /// Version tag of the model behind this classifier.
    fn model_version(&self) -> &str;
}

/// Model server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Prediction endpoint, e.g. "http://model-server:8501/predict"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model version tag recorded on every result row
    #[serde(default = "default_version")]
    pub version: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8501/predict".to_string()
}

fn default_version() -> String {
    "v0".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            version: default_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Wire shape of the model server's prediction response.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    class: String,
    confidence: f64,
    /// Per-stage timings in milliseconds (preprocess/inference/postprocess).
    #[serde(default)]
    speed_ms: std::collections::BTreeMap<String, f64>,
}

impl PredictionResponse {
    fn into_classification(self) -> Result<Classification> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::classifier(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(Classification {
            label: self.class,
            confidence: self.confidence,
            latency_ms: self.speed_ms.values().sum(),
        })
    }
}

/// Classifier backed by a remote model server.
pub struct RemoteClassifier {
    http: reqwest::Client,
    endpoint: String,
    version: String,
}

impl RemoteClassifier {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::classifier(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            version: config.version.clone(),
        })
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, image: Bytes) -> Result<Classification> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| Error::classifier(format!("predict request: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::classifier(format!(
                "model server returned {}",
                response.status()
            )));
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| Error::classifier(format!("malformed prediction: {}", e)))?;

        let classification = prediction.into_classification()?;
        debug!(
            label = %classification.label,
            confidence = classification.confidence,
            latency_ms = classification.latency_ms,
            "Classified image"
        );
        Ok(classification)
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}

/// Check model server reachability.
pub async fn check_connection(config: &ModelConfig) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    // Any HTTP response means the server is up; an empty-body predict call
    // failing with 4xx still proves reachability.
    client.head(&config.endpoint).send().await.is_ok()
}
