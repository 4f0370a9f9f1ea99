//! Prediction pipeline: features, inference, risk, drivers and assembly

mod classifier;
mod drivers;
mod features;
mod inference;
mod onnx;
mod output;
mod risk;
mod service;

pub use classifier::{LinearClassifier, PipelineClassifier, SimpleImputer, StandardScaler};
pub use drivers::{DriverEstimator, MAX_DRIVERS};
pub use features::{
    consistencia_acad, default_feature_names, defa_to_int, status_defa, FeatureDeriver,
    CONSISTENCIA_ACAD, CONSISTENCY_OFFSET, DEFAULT_FEATURES, STATUS_DEFA,
};
pub use inference::{
    DirectStrategy, Invocation, ModelInvoker, PredictionStrategy, StrategyInput, TransformStrategy,
};
pub use onnx::OnnxClassifier;
pub use output::{round_to, Sanitize};
pub use risk::{risk_tier_from_score, RiskScorer};
pub use service::{PredictionService, UNKNOWN_LABEL};

use crate::error::ClassifierError;

/// Trait for classifier implementations bundled in a model artifact
///
/// Rows are dense; missing values are NaN.
pub trait Classifier: Send + Sync {
    /// Class probabilities for a single row, indexed by class
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ClassifierError>;

    /// Predicted class index
    fn predict(&self, row: &[f64]) -> Result<usize, ClassifierError> {
        let probs = self.predict_proba(row)?;
        argmax(&probs).ok_or(ClassifierError::EmptyOutput)
    }

    /// Per-feature importances, aligned with the artifact feature list
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }

    /// Short name used in logs and status
    fn kind(&self) -> &'static str;
}

/// Index of the largest finite value; `None` if there is none
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= *v => best,
            _ => Some((i, *v)),
        })
        .map(|(i, _)| i)
}
