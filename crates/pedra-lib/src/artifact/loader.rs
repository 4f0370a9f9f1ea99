//! JSON artifact parsing
//!
//! An artifact is a JSON object. The classifier sits under one of the model
//! aliases (or the document itself is the classifier when it carries a
//! `kind` field); the imputer, scaler, feature list, class map and version
//! are optional and looked up through their own alias sets.

use super::alias::{
    CLASS_MAP_KEYS, FEATURE_KEYS, IMPUTER_KEYS, MODEL_KEYS, SCALER_KEYS, VERSION_KEYS,
};
use super::{ArtifactSource, ClassMap, ModelArtifact, UNKNOWN_VERSION};
use crate::error::ArtifactError;
use crate::predictor::{
    Classifier, LinearClassifier, OnnxClassifier, PipelineClassifier, SimpleImputer,
    StandardScaler, DEFAULT_FEATURES,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Classifier definition as stored in the artifact
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierSpec {
    Linear(LinearClassifier),
    Pipeline {
        #[serde(default)]
        imputer: Option<SimpleImputer>,
        #[serde(default)]
        scaler: Option<StandardScaler>,
        classifier: Box<ClassifierSpec>,
    },
    Onnx {
        /// Graph file, relative to the artifact directory
        path: PathBuf,
        #[serde(default)]
        n_features: Option<usize>,
        #[serde(default)]
        handles_missing: bool,
        #[serde(default)]
        feature_importances: Option<Vec<f64>>,
    },
}

impl ClassifierSpec {
    /// Instantiate the classifier; `n_features` is used when the definition omits it
    pub fn build(self, base_dir: &Path, n_features: usize) -> Result<Box<dyn Classifier>, ArtifactError> {
        match self {
            ClassifierSpec::Linear(model) => {
                model.validate().map_err(ArtifactError::InvalidClassifier)?;
                Ok(Box::new(model))
            }
            ClassifierSpec::Pipeline {
                imputer,
                scaler,
                classifier,
            } => {
                let inner = classifier.build(base_dir, n_features)?;
                Ok(Box::new(PipelineClassifier::new(imputer, scaler, inner)))
            }
            ClassifierSpec::Onnx {
                path,
                n_features: declared,
                handles_missing,
                feature_importances,
            } => {
                let path = if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                };
                let model = OnnxClassifier::from_path(
                    &path,
                    declared.unwrap_or(n_features),
                    handles_missing,
                    feature_importances,
                )?;
                Ok(Box::new(model))
            }
        }
    }
}

/// Read, fingerprint and parse an artifact file
pub fn load_artifact(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let artifact = parse_artifact(&bytes, base_dir)?.with_source(ArtifactSource {
        path: path.to_path_buf(),
        sha256: sha256.clone(),
    });

    info!(
        path = %path.display(),
        version = %artifact.version(),
        classifier = artifact.classifier().kind(),
        sha256 = %sha256,
        "Loaded model artifact"
    );
    Ok(artifact)
}

/// Parse artifact bytes; relative graph paths resolve against `base_dir`
pub fn parse_artifact(bytes: &[u8], base_dir: &Path) -> Result<ModelArtifact, ArtifactError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let Value::Object(map) = root else {
        return Err(ArtifactError::InvalidClassifier(
            "artifact root must be a JSON object".to_string(),
        ));
    };

    let model_value = match MODEL_KEYS.lookup_key(&map) {
        Some((key, value)) => {
            debug!(key, "Classifier found under alias");
            value.clone()
        }
        None if map.contains_key("kind") => Value::Object(map.clone()),
        None => return Err(ArtifactError::MissingClassifier),
    };

    let feature_names = FEATURE_KEYS
        .lookup(&map)
        .map(|v| decode::<Vec<String>>(v, FEATURE_KEYS.concept))
        .transpose()?;

    let n_features = feature_names
        .as_ref()
        .map(Vec::len)
        .unwrap_or(DEFAULT_FEATURES.len());

    let definition: ClassifierSpec = decode(&model_value, MODEL_KEYS.concept)?;
    let classifier = definition.build(base_dir, n_features)?;

    let mut artifact = ModelArtifact::new(classifier).with_version(version_of(&map));

    if let Some(names) = feature_names {
        artifact = artifact.with_feature_names(names);
    }
    if let Some(value) = IMPUTER_KEYS.lookup(&map) {
        artifact = artifact.with_imputer(decode(value, IMPUTER_KEYS.concept)?);
    }
    if let Some(value) = SCALER_KEYS.lookup(&map) {
        artifact = artifact.with_scaler(decode(value, SCALER_KEYS.concept)?);
    }
    if let Some(class_map) = CLASS_MAP_KEYS.lookup(&map).and_then(ClassMap::from_value) {
        artifact = artifact.with_class_map(class_map);
    }

    Ok(artifact)
}

fn decode<T: DeserializeOwned>(value: &Value, concept: &str) -> Result<T, ArtifactError> {
    T::deserialize(value)
        .map_err(|e| ArtifactError::InvalidClassifier(format!("{}: {}", concept, e)))
}

fn version_of(map: &Map<String, Value>) -> String {
    match VERSION_KEYS.lookup(map) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => UNKNOWN_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn linear_json() -> Value {
        json!({
            "kind": "linear",
            "coefficients": [[1.0, 0.0], [-1.0, 0.0]],
            "intercepts": [0.0, 0.0],
            "feature_importances": [0.8, 0.2]
        })
    }

    fn parse(value: Value) -> Result<ModelArtifact, ArtifactError> {
        parse_artifact(value.to_string().as_bytes(), Path::new("."))
    }

    #[test]
    fn test_full_bundle_with_aliases() {
        let artifact = parse(json!({
            "modelo": linear_json(),
            "imputer": {"statistics": [1.0, 2.0], "feature_names_in": ["A", "B"]},
            "scaler": {"mean": [0.0, 0.0], "scale": [1.0, 1.0]},
            "features_list": ["A", "B"],
            "mapa_pedras": {"Quartzo": 0, "Topázio": 1},
            "versao": 7
        }))
        .unwrap();

        assert_eq!(artifact.classifier().kind(), "linear");
        assert!(artifact.imputer().is_some());
        assert!(artifact.scaler().is_some());
        assert_eq!(artifact.feature_names().unwrap(), ["A", "B"]);
        assert_eq!(artifact.class_map().label(1), Some("Topázio"));
        assert_eq!(artifact.version(), "7");
        assert_eq!(artifact.importance_map().unwrap()["A"], 0.8);
    }

    #[test]
    fn test_root_document_as_classifier() {
        let artifact = parse(linear_json()).unwrap();
        assert_eq!(artifact.version(), UNKNOWN_VERSION);
        assert!(artifact.feature_names().is_none());
        assert!(artifact.class_map().is_empty());
    }

    #[test]
    fn test_pipeline_classifier() {
        let artifact = parse(json!({
            "pipeline": {
                "kind": "pipeline",
                "imputer": {"statistics": [5.0, 0.0]},
                "classifier": linear_json()
            }
        }))
        .unwrap();
        assert_eq!(artifact.classifier().kind(), "pipeline");
        let probs = artifact.classifier().predict_proba(&[f64::NAN, 0.0]).unwrap();
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_missing_and_invalid_classifier() {
        assert!(matches!(
            parse(json!({"version": "1"})),
            Err(ArtifactError::MissingClassifier)
        ));
        assert!(matches!(
            parse(json!({"model": {"kind": "forest"}})),
            Err(ArtifactError::InvalidClassifier(_))
        ));
        assert!(matches!(
            parse(json!({"model": {"kind": "linear", "coefficients": [[1.0]], "intercepts": []}})),
            Err(ArtifactError::InvalidClassifier(_))
        ));
        assert!(matches!(parse(json!([1, 2])), Err(ArtifactError::InvalidClassifier(_))));
        assert!(matches!(
            parse_artifact(b"{not json", Path::new(".")),
            Err(ArtifactError::Json(_))
        ));
    }

    #[test]
    fn test_onnx_path_resolved_against_artifact_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_artifact(
            json!({"model": {"kind": "onnx", "path": "missing.onnx"}}).to_string().as_bytes(),
            dir.path(),
        )
        .unwrap_err();
        match err {
            ArtifactError::Io { path, .. } => assert!(path.starts_with(&dir.path().display().to_string())),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_records_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let body = json!({"model": linear_json(), "version": "2024.1"}).to_string();
        std::fs::write(&path, &body).unwrap();

        let artifact = load_artifact(&path).unwrap();
        assert_eq!(artifact.version(), "2024.1");
        assert_eq!(
            artifact.sha256(),
            Some(hex::encode(Sha256::digest(body.as_bytes())).as_str())
        );
        assert_eq!(artifact.source().unwrap().path, path);

        assert!(matches!(
            load_artifact(&dir.path().join("absent.json")),
            Err(ArtifactError::Io { .. })
        ));
    }
}
