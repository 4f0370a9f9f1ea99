//! Error types shared across the prediction pipeline

use thiserror::Error;

/// Failure raised by a classifier or one of its transforms
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("input contains missing or non-finite values")]
    MissingValues,

    #[error("classifier produced no usable output")]
    EmptyOutput,

    #[error("inference backend error: {0}")]
    Backend(String),
}

/// Request-level failure of the prediction pipeline
///
/// A missing model is not an error: the pipeline degrades to null fields.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Both the direct and the transform strategies failed
    #[error("prediction failed after fallback transform: {source}")]
    TransformFailure {
        #[source]
        source: ClassifierError,
    },
}

/// Problems found while reading a model artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact has no classifier entry")]
    MissingClassifier,

    #[error("invalid classifier definition: {0}")]
    InvalidClassifier(String),

    #[error("failed to load ONNX graph: {0}")]
    Onnx(String),
}

/// Student lookup failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("Data not available")]
    DataUnavailable,

    #[error("Student name column 'NOME' not available")]
    MissingNameColumn,

    #[error("Student not found")]
    NotFound,
}
