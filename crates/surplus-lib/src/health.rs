//! Health tracking for the prediction service
//!
//! Component statuses back the `/health` payload; the readiness flag is set
//! once a model is live.

use crate::models::MODEL_VERSION;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "food-surplus-prediction";

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// `/health` payload; the shape never changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Local>,
}

impl HealthResponse {
    /// Overall status: any unhealthy component wins, then any degraded one
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }
        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL_STORE: &str = "model_store";
    pub const TRAINER: &str = "trainer";
}

#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.components.read().await.get(name).cloned()
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(&components),
            service: SERVICE_NAME.to_string(),
            version: MODEL_VERSION.to_string(),
            timestamp: Local::now(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let status = self.health().await.status;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Model not yet loaded".to_string()),
            }
        } else if status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_health_shape() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.service, SERVICE_NAME);
        assert_eq!(health.version, MODEL_VERSION);
    }

    #[tokio::test]
    async fn test_degraded_trainer() {
        let registry = HealthRegistry::new();
        registry.register(components::MODEL_STORE).await;
        registry.register(components::TRAINER).await;

        registry.set_degraded(components::TRAINER, "retrain failed").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.set_healthy(components::TRAINER).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unhealthy_wins() {
        let registry = HealthRegistry::new();
        registry.register(components::MODEL_STORE).await;
        registry.set_degraded(components::TRAINER, "slow").await;
        registry.set_unhealthy(components::MODEL_STORE, "artifact unreadable").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        let store = registry.component(components::MODEL_STORE).await.unwrap();
        assert_eq!(store.message.as_deref(), Some("artifact unreadable"));
    }

    #[tokio::test]
    async fn test_readiness_transitions() {
        let registry = HealthRegistry::new();
        registry.register(components::MODEL_STORE).await;
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::MODEL_STORE, "failed").await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }
}
