//! Loaded model state shared by request handlers
//!
//! The registry is built empty, then loaded, then handed to whoever serves
//! requests. Readers clone an `Arc` to the current [`ModelSnapshot`] and keep
//! using it for the whole request; a reload assembles a new snapshot off to
//! the side and swaps the pointer, so nobody observes a partial mix.

use super::{load_artifact, ClassMap, ModelArtifact, NO_MODEL_VERSION};
use crate::error::LookupError;
use crate::models::{ModelStatus, StudentHistory};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::default_feature_names;
use crate::store::{FeatureStats, StudentStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

static EMPTY_CLASS_MAP: ClassMap = ClassMap::empty();

/// Where the registry reads its inputs from
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub model_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

/// Immutable view of everything a prediction reads
#[derive(Debug, Default)]
pub struct ModelSnapshot {
    artifact: Option<Arc<ModelArtifact>>,
    store: Option<Arc<StudentStore>>,
    stats: Option<FeatureStats>,
    feature_names: Vec<String>,
    importances: Option<HashMap<String, f64>>,
}

impl ModelSnapshot {
    /// Assemble a snapshot, deriving statistics from the roster
    pub fn build(artifact: Option<Arc<ModelArtifact>>, store: Option<Arc<StudentStore>>) -> Self {
        let feature_names = artifact
            .as_ref()
            .map(|a| a.effective_feature_names())
            .unwrap_or_else(default_feature_names);
        let stats = store
            .as_ref()
            .and_then(|s| FeatureStats::compute(s, &feature_names));
        Self::assemble(artifact, store, stats, feature_names)
    }

    fn assemble(
        artifact: Option<Arc<ModelArtifact>>,
        store: Option<Arc<StudentStore>>,
        stats: Option<FeatureStats>,
        feature_names: Vec<String>,
    ) -> Self {
        let importances = artifact.as_ref().and_then(|a| a.importance_map());
        Self {
            artifact,
            store,
            stats,
            feature_names,
            importances,
        }
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_deref()
    }

    pub fn store(&self) -> Option<&StudentStore> {
        self.store.as_deref()
    }

    pub fn stats(&self) -> Option<&FeatureStats> {
        self.stats.as_ref()
    }

    /// Feature order for derivation
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn importances(&self) -> Option<&HashMap<String, f64>> {
        self.importances.as_ref()
    }

    pub fn class_map(&self) -> &ClassMap {
        self.artifact
            .as_ref()
            .map(|a| a.class_map())
            .unwrap_or(&EMPTY_CLASS_MAP)
    }

    pub fn model_version(&self) -> &str {
        self.artifact
            .as_ref()
            .map(|a| a.version())
            .unwrap_or(NO_MODEL_VERSION)
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            model_loaded: self.artifact.is_some(),
            data_loaded: self.store.is_some(),
            stats_loaded: self.stats.is_some(),
            model_version: self.model_version().to_string(),
            artifact_sha256: self
                .artifact
                .as_ref()
                .and_then(|a| a.sha256())
                .map(str::to_string),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Owner of the current snapshot
pub struct ModelRegistry {
    config: RegistryConfig,
    current: RwLock<Arc<ModelSnapshot>>,
    metrics: Option<ServiceMetrics>,
    logger: Option<StructuredLogger>,
}

impl ModelRegistry {
    /// Empty registry; nothing is read until [`load`](Self::load)
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(ModelSnapshot::build(None, None))),
            metrics: None,
            logger: None,
        }
    }

    /// Registry over in-memory parts, without backing files
    pub fn from_parts(artifact: Option<ModelArtifact>, store: Option<StudentStore>) -> Self {
        let registry = Self::new(RegistryConfig::default());
        registry.swap(ModelSnapshot::build(
            artifact.map(Arc::new),
            store.map(Arc::new),
        ));
        registry
    }

    pub fn with_observability(mut self, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        self.metrics = Some(metrics);
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Initial load; unreadable inputs leave the registry degraded
    pub fn load(&self) -> ModelStatus {
        let artifact = self.read_artifact().map(Arc::new);
        let store = self.read_store().map(Arc::new);
        let snapshot = ModelSnapshot::build(artifact, store);
        let status = snapshot.status();

        if status.model_loaded {
            if let Some(logger) = &self.logger {
                logger.log_model_loaded(&status);
            }
        }
        self.record_version(&status.model_version);
        self.swap(snapshot);
        status
    }

    /// Re-read inputs and swap atomically
    ///
    /// An input that fails to load keeps its previous value.
    pub fn reload(&self) -> ModelStatus {
        let previous = self.snapshot();
        let old_version = previous.model_version().to_string();

        let artifact = self
            .read_artifact()
            .map(Arc::new)
            .or_else(|| previous.artifact.clone());
        let store = self
            .read_store()
            .map(Arc::new)
            .or_else(|| previous.store.clone());

        let snapshot = ModelSnapshot::build(artifact, store);
        let status = snapshot.status();

        if let Some(logger) = &self.logger {
            logger.log_model_reloaded(&old_version, &status);
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_model_reloads();
        }
        self.record_version(&status.model_version);
        self.swap(snapshot);
        status
    }

    /// Current snapshot; cheap to call per request
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn status(&self) -> ModelStatus {
        self.snapshot().status()
    }

    pub fn search_student(&self, name: &str) -> Result<StudentHistory, LookupError> {
        let snapshot = self.snapshot();
        let store = snapshot.store().ok_or(LookupError::DataUnavailable)?;
        store.search_by_name(name)
    }

    fn swap(&self, snapshot: ModelSnapshot) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(snapshot);
    }

    fn record_version(&self, version: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.set_model_version(version);
        }
    }

    fn read_artifact(&self) -> Option<ModelArtifact> {
        let Some(path) = &self.config.model_path else {
            debug!("No model path configured");
            return None;
        };
        if !path.exists() {
            warn!(path = %path.display(), "No model artifact found, continuing without model");
            return None;
        }
        match load_artifact(path) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                match &self.logger {
                    Some(logger) => logger.log_model_load_failed(&path.display().to_string(), &e.to_string()),
                    None => warn!(path = %path.display(), error = %e, "Failed to load model artifact"),
                }
                None
            }
        }
    }

    fn read_store(&self) -> Option<StudentStore> {
        let path = self.config.data_path.as_ref()?;
        if !path.exists() {
            warn!(path = %path.display(), "No dataset found, continuing without data");
            return None;
        }
        match StudentStore::from_path(path) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to load dataset");
                None
            }
        }
    }
}
