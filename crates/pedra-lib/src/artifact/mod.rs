//! Trained model bundle and its lifecycle
//!
//! A [`ModelArtifact`] groups the classifier with the optional preprocessing
//! it was trained with, the expected feature order and the class labels.
//! Artifacts are immutable once built; the [`ModelRegistry`] swaps whole
//! snapshots on reload.

mod alias;
mod loader;
mod registry;
mod watcher;

pub use alias::{
    AliasSet, CLASS_MAP_KEYS, FEATURE_KEYS, IMPUTER_KEYS, MODEL_KEYS, SCALER_KEYS, VERSION_KEYS,
};
pub use loader::{load_artifact, parse_artifact, ClassifierSpec};
pub use registry::{ModelRegistry, ModelSnapshot, RegistryConfig};
pub use watcher::{ArtifactWatcher, WatcherHandle};

use crate::predictor::{default_feature_names, Classifier, SimpleImputer, StandardScaler};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Version reported for an artifact that does not declare one
pub const UNKNOWN_VERSION: &str = "unknown";

/// Version reported when no artifact is loaded
pub const NO_MODEL_VERSION: &str = "none";

/// Where an artifact was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub path: PathBuf,
    pub sha256: String,
}

/// A loaded classifier with everything needed to feed it
pub struct ModelArtifact {
    classifier: Box<dyn Classifier>,
    imputer: Option<SimpleImputer>,
    scaler: Option<StandardScaler>,
    feature_names: Option<Vec<String>>,
    class_map: ClassMap,
    version: String,
    source: Option<ArtifactSource>,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("classifier", &self.classifier.kind())
            .field("imputer", &self.imputer.is_some())
            .field("scaler", &self.scaler.is_some())
            .field("feature_names", &self.feature_names)
            .field("class_map", &self.class_map)
            .field("version", &self.version)
            .finish()
    }
}

impl ModelArtifact {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            imputer: None,
            scaler: None,
            feature_names: None,
            class_map: ClassMap::default(),
            version: UNKNOWN_VERSION.to_string(),
            source: None,
        }
    }

    pub fn with_imputer(mut self, imputer: SimpleImputer) -> Self {
        self.imputer = Some(imputer);
        self
    }

    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn with_class_map(mut self, class_map: ClassMap) -> Self {
        self.class_map = class_map;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_source(mut self, source: ArtifactSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn imputer(&self) -> Option<&SimpleImputer> {
        self.imputer.as_ref()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// Feature order declared by the artifact, if any
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Declared feature order, or the canonical one
    pub fn effective_feature_names(&self) -> Vec<String> {
        self.feature_names
            .clone()
            .unwrap_or_else(default_feature_names)
    }

    pub fn class_map(&self) -> &ClassMap {
        &self.class_map
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> Option<&ArtifactSource> {
        self.source.as_ref()
    }

    pub fn sha256(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.sha256.as_str())
    }

    /// Importances keyed by feature name
    ///
    /// Only available when the classifier reports importances and the
    /// artifact declares its feature list.
    pub fn importance_map(&self) -> Option<HashMap<String, f64>> {
        let importances = self.classifier.feature_importances()?;
        let names = self.feature_names.as_ref()?;
        Some(
            names
                .iter()
                .cloned()
                .zip(importances.iter().copied())
                .collect(),
        )
    }
}

/// Class index to label mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap(BTreeMap<usize, String>);

impl ClassMap {
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Labels in class-index order
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).enumerate().collect())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(i, s)| (i, s.into())).collect())
    }

    /// Read a class map from the artifact
    ///
    /// An object entry is read as label → index when its value is an index,
    /// otherwise as index → label; entries fitting neither are skipped.
    /// Arrays list labels in index order.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map: BTreeMap<usize, String> = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i, value_to_label(v)))
                .collect(),
            Value::Object(entries) => entries
                .iter()
                .filter_map(|(k, v)| match value_to_index(v) {
                    Some(idx) => Some((idx, k.clone())),
                    None => k.trim().parse::<usize>().ok().map(|idx| (idx, value_to_label(v))),
                })
                .collect(),
            _ => return None,
        };
        if map.is_empty() {
            None
        } else {
            Some(Self(map))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    /// Label for a predicted index, or the index itself as text
    pub fn label_or_index(&self, index: usize) -> String {
        self.label(index)
            .map(str::to_string)
            .unwrap_or_else(|| index.to_string())
    }

    /// Key used in the probability map
    pub fn probability_label(&self, index: usize) -> String {
        self.label(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Class_{}", index))
    }

    /// Index of the lowest tier, matched on the trimmed lower-cased label
    pub fn quartzo_index(&self) -> Option<usize> {
        self.0
            .iter()
            .find(|(_, label)| label.trim().to_lowercase() == "quartzo")
            .map(|(idx, _)| *idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(i, s)| (*i, s.as_str()))
    }
}

/// Whether a label names the highest tier
pub fn is_top_tier(label: &str) -> bool {
    matches!(label.trim().to_lowercase().as_str(), "topázio" | "topazio")
}

fn value_to_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
