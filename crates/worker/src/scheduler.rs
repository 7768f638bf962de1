//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use pubsub::Subscriber;
use telemetry::metrics;

use crate::listener::InferenceListener;
use crate::metrics::MetricsWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Uploads topic poll interval
    pub uploads_poll_interval: Duration,
    /// Trigger topic poll interval
    pub trigger_poll_interval: Duration,
    /// Pipeline metrics log interval
    pub metrics_log_interval: Duration,
    /// Run one rollup pass at startup, before the first trigger
    pub run_metrics_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            uploads_poll_interval: Duration::from_secs(1),
            trigger_poll_interval: Duration::from_secs(5),
            metrics_log_interval: Duration::from_secs(60),
            run_metrics_on_start: false,
        }
    }
}

/// Background worker scheduler.
///
/// Each loop is one sequential task, so metrics runs can never overlap:
/// the at-most-one-in-flight assumption holds by construction.
pub struct WorkerScheduler {
    config: WorkerConfig,
    listener: Arc<InferenceListener>,
    metrics_worker: Arc<MetricsWorker>,
    uploads: Arc<Subscriber>,
    trigger: Arc<Subscriber>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        listener: Arc<InferenceListener>,
        metrics_worker: Arc<MetricsWorker>,
        uploads: Arc<Subscriber>,
        trigger: Arc<Subscriber>,
    ) -> Self {
        Self {
            config,
            listener,
            metrics_worker,
            uploads,
            trigger,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_listener_loop().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_loop().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!("Background workers started");
        handles
    }

    /// Polls the uploads topic and feeds notifications to the listener.
    async fn run_listener_loop(&self) {
        let mut ticker = interval(self.config.uploads_poll_interval);

        loop {
            ticker.tick().await;

            let batch = match self.uploads.fetch().await {
                Ok(batch) => batch,
                Err(e) => {
                    error!("Uploads fetch error: {}", e);
                    self.uploads.reset_connection().await;
                    continue;
                }
            };

            if !batch.payloads.is_empty() {
                self.listener.process_batch(&batch.payloads).await;
            }

            // Per-item failures are logged, not retried; commit the batch.
            if let Some(offset) = batch.commit {
                self.uploads.commit(offset);
            }
        }
    }

    /// Polls the trigger topic; any fetched signal starts one rollup run.
    ///
    /// The offset commits only after a successful run, so a failed run is
    /// retried on the next poll instead of being lost.
    async fn run_metrics_loop(&self) {
        if self.config.run_metrics_on_start {
            if let Err(e) = self.metrics_worker.run().await {
                error!("Startup metrics run failed: {}", e);
            }
        }

        let mut ticker = interval(self.config.trigger_poll_interval);

        loop {
            ticker.tick().await;

            let batch = match self.trigger.fetch().await {
                Ok(batch) => batch,
                Err(e) => {
                    error!("Trigger fetch error: {}", e);
                    self.trigger.reset_connection().await;
                    continue;
                }
            };

            let Some(offset) = batch.commit else {
                continue;
            };

            // Signal payloads are unused; any number of pending signals
            // collapses into one run.
            info!(signals = batch.payloads.len(), "Metrics trigger received");

            match self.metrics_worker.run().await {
                Ok(_) => self.trigger.commit(offset),
                Err(e) => {
                    error!("Metrics run failed; leaving trigger uncommitted: {}", e);
                }
            }
        }
    }

    /// Logs a pipeline metrics snapshot on an interval.
    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval);

        loop {
            ticker.tick().await;
            metrics().snapshot().log();
        }
    }
}
