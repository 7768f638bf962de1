//! HTTP object store implementation.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use pipeline_core::{Error, Result};

use crate::config::StorageConfig;
use crate::ObjectStore;

/// Object store speaking plain path-addressed HTTP
/// (`{endpoint}/{bucket}/{object}`), compatible with S3/GCS-style gateways.
pub struct HttpObjectStore {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::config(format!("invalid storage endpoint: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::storage(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            token: config.token.clone(),
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn store(&self, bucket: &str, object: &str, data: Bytes) -> Result<String> {
        let url = self.object_url(bucket, object);
        let response = self
            .authorized(self.http.put(&url).body(data))
            .send()
            .await
            .map_err(|e| Error::storage(format!("put {}: {}", url, e)))?;

        if !response.status().is_success() {
            error!(url = %url, status = %response.status(), "Object upload failed");
            return Err(Error::storage(format!(
                "put {} returned {}",
                url,
                response.status()
            )));
        }

        debug!(url = %url, "Stored object");
        Ok(url)
    }

    async fn retrieve(&self, bucket: &str, object: &str) -> Result<Bytes> {
        let url = self.object_url(bucket, object);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| Error::storage(format!("get {}: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::object_not_found(bucket, object));
        }
        if !response.status().is_success() {
            return Err(Error::storage(format!(
                "get {} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::storage(format!("get {} body: {}", url, e)))?;

        debug!(url = %url, bytes = bytes.len(), "Retrieved object");
        Ok(bytes)
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            bucket,
            object
        )
    }
}

/// Check object storage reachability.
///
/// Any HTTP response counts, auth errors included; only transport failures
/// mark the endpoint unhealthy.
pub async fn check_connection(config: &StorageConfig) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    match client.head(&config.endpoint).send().await {
        Ok(_) => {
            debug!("Storage endpoint reachable");
            true
        }
        Err(e) => {
            error!("Storage health check failed: {}", e);
            false
        }
    }
}
