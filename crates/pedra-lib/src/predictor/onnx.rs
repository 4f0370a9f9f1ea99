//! ONNX classifier inference using tract
//!
//! Runs classifiers exported to ONNX (for example through skl2onnx with
//! `zipmap=False`). The probability tensor is taken from the last float
//! output of the graph.

use super::Classifier;
use crate::error::{ArtifactError, ClassifierError};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Classifier backed by an optimized tract plan
pub struct OnnxClassifier {
    model: TractModel,
    n_features: usize,
    handles_missing: bool,
    feature_importances: Option<Vec<f64>>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("n_features", &self.n_features)
            .field("handles_missing", &self.handles_missing)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load a graph from disk
    ///
    /// `handles_missing` declares that the graph embeds its own imputation,
    /// so NaN inputs are passed through instead of rejected.
    pub fn from_path(
        path: &Path,
        n_features: usize,
        handles_missing: bool,
        feature_importances: Option<Vec<f64>>,
    ) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::load_model(&bytes, n_features)?;
        Ok(Self {
            model,
            n_features,
            handles_missing,
            feature_importances,
        })
    }

    /// Parse, type and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], n_features: usize) -> Result<TractModel, ArtifactError> {
        let onnx_err = |e: TractError| ArtifactError::Onnx(format!("{:#}", e));
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(onnx_err)?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .map_err(onnx_err)?
            .into_optimized()
            .map_err(onnx_err)?
            .into_runnable()
            .map_err(onnx_err)
    }

    fn row_to_tensor(&self, row: &[f64]) -> Result<Tensor, ClassifierError> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .map(Tensor::from)
            .map_err(|e| ClassifierError::Backend(e.to_string()))
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if row.len() != self.n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if !self.handles_missing && row.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::MissingValues);
        }

        let start = Instant::now();
        let input = self.row_to_tensor(row)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Backend(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        // label output comes first as int64, probabilities follow as f32
        for output in outputs.iter().rev() {
            if let Ok(view) = output.to_array_view::<f32>() {
                let probs: Vec<f64> = view.iter().map(|p| f64::from(*p)).collect();
                if !probs.is_empty() {
                    return Ok(probs);
                }
            }
        }
        Err(ClassifierError::EmptyOutput)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = OnnxClassifier::from_path(Path::new("/nonexistent/model.onnx"), 10, false, None)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = OnnxClassifier::from_path(&path, 10, false, None).unwrap_err();
        assert!(matches!(err, ArtifactError::Onnx(_)));
    }
}
