//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// HTTP object storage configuration (S3/GCS-style path addressing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base endpoint, e.g. "https://storage.example.com"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token (optional; anonymous for public buckets)
    pub token: Option<String>,
    /// Bucket holding raw and result images
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_image_bucket() -> String {
    "casting-images".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            image_bucket: default_image_bucket(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
