//! Wire messages on the trigger bus.

use serde::{Deserialize, Serialize};

use pipeline_core::{Error, Result};

/// Notification that an image landed in object storage.
///
/// Mirrors the storage service's object-finalize payload; unknown fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNotification {
    /// Bucket the object was written to.
    pub bucket: String,
    /// Object path within the bucket.
    #[serde(rename = "name")]
    pub object: String,
}

impl UploadNotification {
    /// Parses a raw record payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| Error::malformed_message(format!("upload notification: {}", e)))
    }

    /// Final path component, used as the local object name.
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }
}
