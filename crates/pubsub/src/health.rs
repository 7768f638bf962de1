//! Bus health checks.

use crate::config::BusConfig;
use rskafka::client::ClientBuilder;
use tracing::{debug, error};

/// Check broker connection health.
pub async fn check_connection(config: &BusConfig) -> bool {
    let connection = config.broker_string();

    match ClientBuilder::new(vec![connection]).build().await {
        Ok(client) => match client.list_topics().await {
            Ok(topics) => {
                debug!(topics = topics.len(), "Bus connection healthy");
                true
            }
            Err(e) => {
                error!("Failed to list bus topics: {}", e);
                false
            }
        },
        Err(e) => {
            error!("Failed to connect to bus: {}", e);
            false
        }
    }
}

/// Returns the configured topics that do not exist yet.
pub async fn missing_topics(config: &BusConfig) -> Vec<String> {
    let wanted = [config.uploads_topic.as_str(), config.trigger_topic.as_str()];

    match ClientBuilder::new(vec![config.broker_string()]).build().await {
        Ok(client) => match client.list_topics().await {
            Ok(existing_topics) => {
                let existing: std::collections::HashSet<_> =
                    existing_topics.iter().map(|t| t.name.as_str()).collect();

                wanted
                    .iter()
                    .filter(|t| !existing.contains(*t))
                    .map(|t| t.to_string())
                    .collect()
            }
            Err(_) => wanted.iter().map(|t| t.to_string()).collect(),
        },
        Err(_) => wanted.iter().map(|t| t.to_string()).collect(),
    }
}
