//! Unified error types for the inspection pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the inspection pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Warehouse query or transport failure (network, auth, quota).
    ///
    /// Never retried within a run; the invoking scheduler's retry policy
    /// handles recovery.
    #[error("warehouse error: {0}")]
    Warehouse(String),

    /// The addressed object does not exist in the bucket.
    ///
    /// Kept distinct from [`Error::Storage`] so callers can tell a missing
    /// image apart from a transport failure.
    #[error("object not found: {bucket}/{object}")]
    ObjectNotFound { bucket: String, object: String },

    /// Object storage transport failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Model server failure or malformed prediction response.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Trigger bus connection or fetch failure.
    #[error("message bus error: {0}")]
    Bus(String),

    /// Malformed message payload on the bus.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn warehouse(msg: impl Into<String>) -> Self {
        Self::Warehouse(msg.into())
    }

    pub fn object_not_found(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }

    pub fn malformed_message(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the object-missing case, false for every other storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }
}
