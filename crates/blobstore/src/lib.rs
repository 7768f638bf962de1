//! Object storage capability.
//!
//! The pipeline treats storage as an opaque collaborator: store bytes at a
//! (bucket, path), get a public URL back; retrieve bytes; a missing object
//! is a distinct error, not a generic transport failure.

pub mod config;
pub mod http;

pub use config::StorageConfig;
pub use http::HttpObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use pipeline_core::Result;

/// Object storage capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` at `bucket/object` and returns its public URL.
    async fn store(&self, bucket: &str, object: &str, data: Bytes) -> Result<String>;

    /// Retrieves the bytes at `bucket/object`.
    ///
    /// Returns [`pipeline_core::Error::ObjectNotFound`] when the object does
    /// not exist.
    async fn retrieve(&self, bucket: &str, object: &str) -> Result<Bytes>;

    /// Public URL an object would be served from, without touching it.
    fn object_url(&self, bucket: &str, object: &str) -> String;
}
