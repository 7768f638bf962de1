//! ClickHouse client wrapper.

use crate::config::WarehouseConfig;
use clickhouse::Client;
use pipeline_core::Result;
use tracing::info;

/// ClickHouse client wrapper.
///
/// Constructed once by the process entry point and handed to each component;
/// no module-level client state anywhere.
#[derive(Clone)]
pub struct Warehouse {
    inner: Client,
    config: WarehouseConfig,
}

impl Warehouse {
    /// Creates a new warehouse handle.
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created warehouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }
}
