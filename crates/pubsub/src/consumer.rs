//! Polling subscriber for one bus topic.
//!
//! Uses rskafka with manual offset tracking for at-least-once delivery.
//! Payload interpretation is the caller's business: the listener parses
//! upload notifications, the metrics loop only counts records.

use crate::config::BusConfig;
use pipeline_core::{Error, Result};
use rskafka::client::{
    partition::{OffsetAt, PartitionClient, UnknownTopicHandling},
    ClientBuilder, Credentials, SaslConfig,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Creates a TLS configuration for managed clusters.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Offset to commit after a batch is fully processed.
#[derive(Debug, Clone, Copy)]
pub struct Offset {
    pub partition: i32,
    pub offset: i64,
}

/// One fetched batch of raw record payloads.
#[derive(Debug, Default)]
pub struct FetchedBatch {
    pub payloads: Vec<Vec<u8>>,
    /// Offset to commit once the batch is processed; `None` when nothing
    /// was fetched.
    pub commit: Option<Offset>,
}

/// Subscriber for one bus topic.
pub struct Subscriber {
    topic: String,
    brokers: Vec<String>,
    sasl_username: Option<String>,
    sasl_password: Option<String>,
    fetch_max_bytes: i32,
    /// Partition client (single-partition topics)
    partition_client: RwLock<Option<Arc<PartitionClient>>>,
    /// Next offset to read
    current_offset: AtomicI64,
    initialized: AtomicBool,
}

impl Subscriber {
    /// Creates a subscriber for `topic` using the shared bus config.
    pub fn new(config: &BusConfig, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        info!(topic = %topic, brokers = ?config.brokers, "Creating bus subscriber");

        Self {
            topic,
            brokers: config.brokers.clone(),
            sasl_username: config.sasl_username.clone(),
            sasl_password: config.sasl_password.clone(),
            fetch_max_bytes: config.fetch_max_bytes,
            partition_client: RwLock::new(None),
            current_offset: AtomicI64::new(-1),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        {
            let client = self.partition_client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let connection = self.brokers.join(",");
        let mut builder = ClientBuilder::new(vec![connection]);

        if let (Some(username), Some(password)) = (&self.sasl_username, &self.sasl_password) {
            builder = builder
                .tls_config(create_tls_config())
                .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                    username.clone(),
                    password.clone(),
                )));
        }

        let client = builder
            .build()
            .await
            .map_err(|e| Error::bus(format!("failed to connect to broker: {}", e)))?;

        let partition_client = client
            .partition_client(self.topic.clone(), 0, UnknownTopicHandling::Error)
            .await
            .map_err(|e| Error::bus(format!("failed to get partition client: {}", e)))?;
        let partition_client = Arc::new(partition_client);

        if !self.initialized.load(Ordering::SeqCst) {
            // Start from the latest offset on first connect; missed history
            // is covered by the next run re-deriving state from the
            // warehouse, not by replaying signals.
            let offset = partition_client
                .get_offset(OffsetAt::Latest)
                .await
                .map_err(|e| Error::bus(format!("failed to get offset: {}", e)))?;

            self.current_offset.store(offset, Ordering::SeqCst);
            self.initialized.store(true, Ordering::SeqCst);

            info!(topic = %self.topic, offset = offset, "Subscriber initialized at offset");
        }

        {
            let mut guard = self.partition_client.write().await;
            *guard = Some(partition_client.clone());
        }

        Ok(partition_client)
    }

    /// Fetches whatever is available past the current offset.
    pub async fn fetch(&self) -> Result<FetchedBatch> {
        let client = self.ensure_connected().await?;
        let current = self.current_offset.load(Ordering::SeqCst);

        let (records, _watermark) = client
            .fetch_records(current, 1..self.fetch_max_bytes, 500)
            .await
            .map_err(|e| {
                error!(topic = %self.topic, "Fetch error: {}", e);
                Error::bus(format!("failed to fetch records: {}", e))
            })?;

        if records.is_empty() {
            return Ok(FetchedBatch::default());
        }

        let mut payloads = Vec::with_capacity(records.len());
        let mut max_offset = current;

        for record in records {
            max_offset = record.offset.max(max_offset);
            match record.record.value {
                Some(value) => payloads.push(value),
                None => warn!(
                    topic = %self.topic,
                    offset = record.offset,
                    "Skipping record with empty payload"
                ),
            }
        }

        debug!(
            topic = %self.topic,
            records = payloads.len(),
            offset_start = current,
            offset_end = max_offset,
            "Fetched batch from bus"
        );

        Ok(FetchedBatch {
            payloads,
            commit: Some(Offset {
                partition: 0,
                offset: max_offset + 1,
            }),
        })
    }

    /// Commits an offset after successful processing.
    pub fn commit(&self, offset: Offset) {
        let prev = self.current_offset.swap(offset.offset, Ordering::SeqCst);
        debug!(
            topic = %self.topic,
            partition = offset.partition,
            prev_offset = prev,
            new_offset = offset.offset,
            "Committed offset"
        );
    }

    /// Returns the current consumer offset.
    pub fn current_offset(&self) -> i64 {
        self.current_offset.load(Ordering::SeqCst)
    }

    /// Checks if the subscriber can reach its partition.
    pub async fn health_check(&self) -> bool {
        match self.ensure_connected().await {
            Ok(_) => true,
            Err(e) => {
                error!(topic = %self.topic, "Subscriber health check failed: {}", e);
                false
            }
        }
    }

    /// Resets the connection (for error recovery).
    pub async fn reset_connection(&self) {
        let mut client = self.partition_client.write().await;
        *client = None;
        info!(topic = %self.topic, "Subscriber connection reset");
    }
}
