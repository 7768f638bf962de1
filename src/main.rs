//! Castwatch visual-inspection pipeline
//!
//! Two long-running jobs over one shared warehouse:
//! - Inference listener: turns image upload notifications into classified
//!   result rows
//! - Weekly metrics worker: rolls result rows up into per-week aggregate
//!   tables on trigger signals

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Weekday;
use tokio::signal;
use tracing::{error, info};

use blobstore::{HttpObjectStore, StorageConfig};
use pipeline_core::ReferenceZone;
use pubsub::{BusConfig, Subscriber};
use telemetry::{health, init_tracing_from_env};
use vision::{ModelConfig, RemoteClassifier};
use warehouse::{Warehouse, WarehouseConfig};
use worker::{InferenceListener, MetricsWorker, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    /// UTC offset in hours of the reporting zone for week boundaries
    #[serde(default = "default_week_utc_offset")]
    week_utc_offset: i32,

    #[serde(default)]
    bus: BusConfig,

    #[serde(default)]
    warehouse: WarehouseConfig,

    #[serde(default)]
    storage: StorageConfig,

    #[serde(default)]
    model: ModelConfig,
}

fn default_week_utc_offset() -> i32 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            week_utc_offset: default_week_utc_offset(),
            bus: BusConfig::default(),
            warehouse: WarehouseConfig::default(),
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider BEFORE any TLS operations
    // rustls 0.23+ requires explicit crypto provider selection
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Castwatch pipeline v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    info!(
        brokers = ?config.bus.brokers,
        uploads_topic = %config.bus.uploads_topic,
        trigger_topic = %config.bus.trigger_topic,
        "Loaded bus config"
    );

    let zone = ReferenceZone::new(config.week_utc_offset, Weekday::Sun)
        .context("Invalid week reporting zone offset")?;

    // Initialize the warehouse client
    let store = Arc::new(
        Warehouse::new(config.warehouse.clone()).context("Failed to create warehouse client")?,
    );

    // Initialize the warehouse schema
    if let Err(e) = warehouse::health::init_schema(&store).await {
        error!("Failed to initialize warehouse schema: {}", e);
        // Continue anyway - schema might already exist
    }

    // Check health and update status
    check_health(&config, &store).await;

    // Object storage and the model server behind the trait seams
    let storage = Arc::new(
        HttpObjectStore::new(&config.storage).context("Failed to create object store client")?,
    );
    let classifier =
        Arc::new(RemoteClassifier::new(&config.model).context("Failed to create classifier")?);

    // Subscribers for the two topics
    let uploads = Arc::new(Subscriber::new(&config.bus, config.bus.uploads_topic.clone()));
    let trigger = Arc::new(Subscriber::new(&config.bus, config.bus.trigger_topic.clone()));

    let listener = Arc::new(InferenceListener::new(
        storage.clone(),
        classifier.clone(),
        store.clone(),
    ));
    let metrics_worker = Arc::new(MetricsWorker::new(store.clone(), store.clone(), zone));

    // Start background workers
    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig::default(),
        listener,
        metrics_worker,
        uploads,
        trigger,
    ));
    let _worker_handles = scheduler.start();

    // Run until interrupted
    shutdown_signal().await;

    info!("Shutting down...");
    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CASTWATCH")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested bus config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(brokers) = std::env::var("CASTWATCH_BUS_BROKERS") {
        config.bus.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(username) = std::env::var("CASTWATCH_BUS_SASL_USERNAME") {
        config.bus.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("CASTWATCH_BUS_SASL_PASSWORD") {
        config.bus.sasl_password = Some(password);
    }
    if let Ok(topic) = std::env::var("CASTWATCH_BUS_UPLOADS_TOPIC") {
        config.bus.uploads_topic = topic;
    }
    if let Ok(topic) = std::env::var("CASTWATCH_BUS_TRIGGER_TOPIC") {
        config.bus.trigger_topic = topic;
    }

    // Manual overrides for nested warehouse config
    if let Ok(url) = std::env::var("CASTWATCH_WAREHOUSE_URL") {
        config.warehouse.url = url;
    }
    if let Ok(database) = std::env::var("CASTWATCH_WAREHOUSE_DATABASE") {
        config.warehouse.database = database;
    }
    if let Ok(username) = std::env::var("CASTWATCH_WAREHOUSE_USERNAME") {
        config.warehouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("CASTWATCH_WAREHOUSE_PASSWORD") {
        config.warehouse.password = Some(password);
    }

    // Object storage and model server overrides
    if let Ok(endpoint) = std::env::var("CASTWATCH_STORAGE_ENDPOINT") {
        config.storage.endpoint = endpoint;
    }
    if let Ok(token) = std::env::var("CASTWATCH_STORAGE_TOKEN") {
        config.storage.token = Some(token);
    }
    if let Ok(bucket) = std::env::var("CASTWATCH_STORAGE_IMAGE_BUCKET") {
        config.storage.image_bucket = bucket;
    }
    if let Ok(endpoint) = std::env::var("CASTWATCH_MODEL_ENDPOINT") {
        config.model.endpoint = endpoint;
    }
    if let Ok(version) = std::env::var("CASTWATCH_MODEL_VERSION") {
        config.model.version = version;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(config: &Config, store: &Warehouse) {
    // Check the trigger bus
    let bus_healthy = pubsub::health::check_connection(&config.bus).await;
    if bus_healthy {
        health().bus.set_healthy();
        info!("Bus connection: healthy");
    } else {
        health().bus.set_unhealthy("Connection failed");
        error!("Bus connection: unhealthy");
    }

    // Check the warehouse
    let wh_healthy = warehouse::health::check_connection(store).await;
    if wh_healthy {
        health().warehouse.set_healthy();
        info!("Warehouse connection: healthy");
    } else {
        health().warehouse.set_unhealthy("Connection failed");
        error!("Warehouse connection: unhealthy");
    }

    // Check object storage
    let storage_healthy = blobstore::http::check_connection(&config.storage).await;
    if storage_healthy {
        health().storage.set_healthy();
        info!("Object storage connection: healthy");
    } else {
        health().storage.set_unhealthy("Connection failed");
        error!("Object storage connection: unhealthy");
    }

    // Check the model server
    let model_healthy = vision::check_connection(&config.model).await;
    if model_healthy {
        health().model.set_healthy();
        info!("Model server connection: healthy");
    } else {
        health().model.set_unhealthy("Connection failed");
        error!("Model server connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
