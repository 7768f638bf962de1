//! Trigger bus configuration.

use serde::{Deserialize, Serialize};

/// Trigger bus configuration shared by both subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// SASL username (managed clusters)
    pub sasl_username: Option<String>,
    /// SASL password (managed clusters)
    pub sasl_password: Option<String>,
    /// Topic carrying image upload notifications
    #[serde(default = "default_uploads_topic")]
    pub uploads_topic: String,
    /// Topic carrying scheduler trigger signals for the metrics job
    #[serde(default = "default_trigger_topic")]
    pub trigger_topic: String,
    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Max bytes fetched per poll
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: i32,
}

fn default_uploads_topic() -> String {
    "casting.images.uploaded".to_string()
}

fn default_trigger_topic() -> String {
    "casting.metrics.trigger".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_fetch_max_bytes() -> i32 {
    1024 * 1024
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            sasl_username: None,
            sasl_password: None,
            uploads_topic: default_uploads_topic(),
            trigger_topic: default_trigger_topic(),
            poll_interval_ms: default_poll_interval_ms(),
            fetch_max_bytes: default_fetch_max_bytes(),
        }
    }
}

impl BusConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }
}
