//! Component health tracking.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for the pipeline as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }
}

/// Global health registry, one entry per external collaborator.
pub struct HealthRegistry {
    pub warehouse: ComponentHealth,
    pub bus: ComponentHealth,
    pub storage: ComponentHealth,
    pub model: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            warehouse: ComponentHealth::new("warehouse"),
            bus: ComponentHealth::new("bus"),
            storage: ComponentHealth::new("storage"),
            model: ComponentHealth::new("model"),
        }
    }

    fn components(&self) -> [&ComponentHealth; 4] {
        [&self.warehouse, &self.bus, &self.storage, &self.model]
    }

    /// Overall status: healthy when every component is, degraded when some
    /// are, unhealthy when none are.
    pub fn status(&self) -> HealthStatus {
        let healthy = self.components().iter().filter(|c| c.is_healthy()).count();
        match healthy {
            4 => HealthStatus::Healthy,
            0 => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        }
    }

    /// Logs one line per unhealthy component.
    pub fn log_unhealthy(&self) {
        for component in self.components() {
            if !component.is_healthy() {
                tracing::warn!(
                    component = component.name(),
                    message = component.message().as_deref().unwrap_or("unknown"),
                    "Component unhealthy"
                );
            }
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
