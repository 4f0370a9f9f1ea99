//! Liveness and readiness reporting
//!
//! Component health is read from the model registry on every probe, so a
//! reload from any source (HTTP, file watcher) is reflected immediately. A
//! missing model degrades the service instead of failing it: predictions are
//! still answered with the fallback response.

use crate::artifact::ModelRegistry;
use crate::models::ModelStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working with reduced functionality
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn check(loaded: bool, missing: &str, now: i64) -> Self {
        let (status, message) = if loaded {
            (ComponentStatus::Healthy, None)
        } else {
            (ComponentStatus::Degraded, Some(missing.to_string()))
        };
        Self {
            status,
            message,
            last_check_timestamp: now,
        }
    }
}

/// Component names for health tracking
pub mod components {
    pub const MODEL: &str = "model";
    pub const DATASET: &str = "dataset";
    pub const STATISTICS: &str = "statistics";
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub model_version: String,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

impl From<&ModelStatus> for HealthResponse {
    fn from(status: &ModelStatus) -> Self {
        let now = chrono::Utc::now().timestamp();
        let components = BTreeMap::from([
            (
                components::MODEL,
                ComponentHealth::check(
                    status.model_loaded,
                    "No model loaded, serving fallback responses",
                    now,
                ),
            ),
            (
                components::DATASET,
                ComponentHealth::check(
                    status.data_loaded,
                    "No dataset loaded, student lookup unavailable",
                    now,
                ),
            ),
            (
                components::STATISTICS,
                ComponentHealth::check(
                    status.stats_loaded,
                    "No reference statistics, drivers use raw values",
                    now,
                ),
            ),
        ]);

        let overall = if components
            .values()
            .all(|c| c.status == ComponentStatus::Healthy)
        {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Degraded
        };

        Self {
            status: overall,
            model_version: status.model_version.clone(),
            components,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Health view over a model registry plus the startup readiness flag
#[derive(Clone)]
pub struct HealthRegistry {
    models: Arc<ModelRegistry>,
    ready: Arc<AtomicBool>,
}

impl HealthRegistry {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self {
            models,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse::from(&self.models.status())
    }

    pub fn readiness(&self) -> ReadinessResponse {
        if self.ready.load(Ordering::SeqCst) {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ModelArtifact, RegistryConfig};
    use crate::predictor::LinearClassifier;

    fn artifact() -> ModelArtifact {
        ModelArtifact::new(Box::new(
            LinearClassifier::new(vec![vec![1.0]], vec![0.0]).unwrap(),
        ))
    }

    #[test]
    fn test_loaded_model_is_healthy() {
        let health = HealthRegistry::new(Arc::new(ModelRegistry::from_parts(Some(artifact()), None)));
        let response = health.health();

        assert_eq!(response.components[components::MODEL].status, ComponentStatus::Healthy);
        assert!(response.components[components::MODEL].message.is_none());
        // no dataset in this registry
        assert_eq!(response.status, ComponentStatus::Degraded);
        assert_eq!(response.components[components::DATASET].status, ComponentStatus::Degraded);
    }

    #[test]
    fn test_missing_model_degrades() {
        let health = HealthRegistry::new(Arc::new(ModelRegistry::from_parts(None, None)));
        let response = health.health();

        assert_eq!(response.status, ComponentStatus::Degraded);
        assert_eq!(response.model_version, "none");
        assert!(response.components[components::MODEL].message.is_some());
    }

    #[test]
    fn test_reload_is_reflected_without_bookkeeping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let models = Arc::new(ModelRegistry::new(RegistryConfig {
            model_path: Some(path.clone()),
            data_path: None,
        }));
        models.load();
        let health = HealthRegistry::new(Arc::clone(&models));
        assert_eq!(
            health.health().components[components::MODEL].status,
            ComponentStatus::Degraded
        );

        let body = serde_json::json!({
            "model": {"kind": "linear", "coefficients": [[1.0]], "intercepts": [0.0]},
            "features": ["IAN"],
            "version": "v2"
        });
        std::fs::write(&path, body.to_string()).unwrap();
        models.reload();

        let response = health.health();
        assert_eq!(response.components[components::MODEL].status, ComponentStatus::Healthy);
        assert_eq!(response.model_version, "v2");
    }

    #[test]
    fn test_readiness_follows_flag() {
        let health = HealthRegistry::new(Arc::new(ModelRegistry::from_parts(None, None)));
        let readiness = health.readiness();
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        // a degraded service still takes traffic
        health.set_ready(true);
        assert!(health.readiness().ready);
    }
}
