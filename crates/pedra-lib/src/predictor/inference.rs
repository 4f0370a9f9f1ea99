//! Model invocation with graceful degradation
//!
//! Inference runs through an ordered chain of strategies. The first one that
//! yields a usable class wins. Output with no finite probability is kept
//! unclassified rather than failed; if every strategy errors the last error
//! is surfaced as a transform failure. With no artifact loaded nothing is
//! attempted and the invocation is empty.

use super::argmax;
use crate::artifact::ModelArtifact;
use crate::error::{ClassifierError, PredictionError};
use crate::models::FeatureRow;
use crate::store::FeatureStats;
use tracing::{debug, warn};

/// Everything a strategy may read while attempting a prediction
pub struct StrategyInput<'a> {
    pub artifact: &'a ModelArtifact,
    pub stats: Option<&'a FeatureStats>,
    pub row: &'a FeatureRow,
}

/// One way of turning a feature row into class probabilities
pub trait PredictionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, input: &StrategyInput<'_>) -> Result<Vec<f64>, ClassifierError>;
}

/// Hand the raw row to the classifier; works for self-contained pipelines
pub struct DirectStrategy;

impl PredictionStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn attempt(&self, input: &StrategyInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        input.artifact.classifier().predict_proba(&input.row.to_dense())
    }
}

/// Impute (bundled imputer or medians), scale, then predict
pub struct TransformStrategy;

impl TransformStrategy {
    fn impute(input: &StrategyInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        let row = input.row;
        match input.artifact.imputer() {
            Some(imputer) => match imputer.align(row) {
                Some(aligned) => imputer
                    .transform(&aligned)
                    .or_else(|_| imputer.transform(&row.to_dense())),
                None => imputer.transform(&row.to_dense()),
            },
            None => Ok(row
                .iter()
                .map(|(name, value)| {
                    value
                        .filter(|v| v.is_finite())
                        .or_else(|| input.stats.and_then(|s| s.median(name)))
                        .unwrap_or(0.0)
                })
                .collect()),
        }
    }
}

impl PredictionStrategy for TransformStrategy {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn attempt(&self, input: &StrategyInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        let mut values = Self::impute(input)?;
        if let Some(scaler) = input.artifact.scaler() {
            values = scaler.transform(&values)?;
        }
        input.artifact.classifier().predict_proba(&values)
    }
}

/// Outcome of a model invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub probabilities: Option<Vec<f64>>,
    pub class_index: Option<usize>,
    /// Name of the strategy that produced the result
    pub strategy: Option<&'static str>,
}

impl Invocation {
    /// No model available: nothing predicted
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self.strategy, Some(name) if name != DirectStrategy.name())
    }
}

/// Runs the strategy chain against the loaded artifact
pub struct ModelInvoker {
    strategies: Vec<Box<dyn PredictionStrategy>>,
}

impl Default for ModelInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelInvoker {
    /// Direct prediction first, transform fallback second
    pub fn new() -> Self {
        Self::with_strategies(vec![Box::new(DirectStrategy), Box::new(TransformStrategy)])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn PredictionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn predict(
        &self,
        artifact: Option<&ModelArtifact>,
        stats: Option<&FeatureStats>,
        row: &FeatureRow,
    ) -> Result<Invocation, PredictionError> {
        let Some(artifact) = artifact else {
            debug!("No model loaded, skipping inference");
            return Ok(Invocation::unavailable());
        };

        let input = StrategyInput {
            artifact,
            stats,
            row,
        };

        let mut last_error = ClassifierError::EmptyOutput;
        let mut unusable: Option<(Vec<f64>, &'static str)> = None;
        for strategy in &self.strategies {
            match strategy.attempt(&input) {
                Ok(probs) => match argmax(&probs) {
                    Some(idx) => {
                        debug!(strategy = strategy.name(), class_index = idx, "Inference succeeded");
                        return Ok(Invocation {
                            probabilities: Some(probs),
                            class_index: Some(idx),
                            strategy: Some(strategy.name()),
                        });
                    }
                    None if probs.is_empty() => last_error = ClassifierError::EmptyOutput,
                    None => {
                        debug!(strategy = strategy.name(), "Inference produced no finite probability");
                        unusable.get_or_insert((probs, strategy.name()));
                    }
                },
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "Inference strategy failed");
                    last_error = e;
                }
            }
        }

        // the model ran but its output is not a number: report it unclassified
        if let Some((probs, name)) = unusable {
            warn!(strategy = name, "Model output is not finite, prediction left unclassified");
            return Ok(Invocation {
                probabilities: Some(probs),
                class_index: None,
                strategy: Some(name),
            });
        }

        warn!(error = %last_error, "All inference strategies failed");
        Err(PredictionError::TransformFailure { source: last_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ClassMap, ModelArtifact};
    use crate::predictor::{LinearClassifier, SimpleImputer, StandardScaler};
    use std::collections::HashMap;

    fn classifier() -> LinearClassifier {
        LinearClassifier::new(vec![vec![-1.0, 0.0], vec![1.0, 0.0]], vec![0.0, 0.0]).unwrap()
    }

    fn row(a: Option<f64>, b: Option<f64>) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.push("A", a);
        row.push("B", b);
        row
    }

    #[test]
    fn test_no_model_returns_empty_invocation() {
        let result = ModelInvoker::new()
            .predict(None, None, &row(Some(1.0), Some(1.0)))
            .unwrap();
        assert_eq!(result, Invocation::unavailable());
    }

    #[test]
    fn test_direct_path_used_for_complete_rows() {
        let artifact = ModelArtifact::new(Box::new(classifier()));
        let result = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(Some(2.0), Some(0.0)))
            .unwrap();
        assert_eq!(result.strategy, Some("direct"));
        assert_eq!(result.class_index, Some(1));
        assert!(!result.used_fallback());
    }

    #[test]
    fn test_fallback_uses_imputer() {
        let artifact = ModelArtifact::new(Box::new(classifier())).with_imputer(SimpleImputer {
            statistics: vec![-3.0, 0.0],
            feature_names_in: Some(vec!["A".to_string(), "B".to_string()]),
        });
        let result = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(None, Some(0.0)))
            .unwrap();
        assert_eq!(result.strategy, Some("transform"));
        assert_eq!(result.class_index, Some(0));
        assert!(result.used_fallback());
    }

    #[test]
    fn test_fallback_fills_with_medians_then_zero() {
        let artifact = ModelArtifact::new(Box::new(classifier()));
        let stats = FeatureStats::from_maps(
            HashMap::from([("A".to_string(), 4.0)]),
            HashMap::from([("A".to_string(), 1.0)]),
        );
        let result = ModelInvoker::new()
            .predict(Some(&artifact), Some(&stats), &row(None, None))
            .unwrap();
        assert_eq!(result.class_index, Some(1));

        // without medians the row becomes all zeros: equal logits, first class wins
        let result = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(None, None))
            .unwrap();
        let probs = result.probabilities.unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert_eq!(result.class_index, Some(0));
    }

    #[test]
    fn test_fallback_applies_scaler() {
        let artifact = ModelArtifact::new(Box::new(classifier())).with_scaler(StandardScaler {
            mean: Some(vec![10.0, 0.0]),
            scale: Some(vec![1.0, 1.0]),
        });
        // direct fails on the missing B; scaled A = 5 - 10 < 0 favours class 0
        let result = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(Some(5.0), None))
            .unwrap();
        assert_eq!(result.strategy, Some("transform"));
        assert_eq!(result.class_index, Some(0));
    }

    #[test]
    fn test_non_finite_output_is_unclassified() {
        // opposite weights on huge inputs give inf - inf logits
        let model = LinearClassifier::new(
            vec![vec![2.0, -2.0], vec![-2.0, 2.0], vec![1.0, 1.0]],
            vec![0.0; 3],
        )
        .unwrap();
        let artifact = ModelArtifact::new(Box::new(model));
        let result = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(Some(1e308), Some(1e308)))
            .unwrap();

        assert_eq!(result.class_index, None);
        assert_eq!(result.strategy, Some("direct"));
        assert!(result.probabilities.unwrap().iter().all(|p| p.is_nan()));
    }

    #[test]
    fn test_both_paths_failing_is_transform_failure() {
        let artifact = ModelArtifact::new(Box::new(classifier()))
            .with_imputer(SimpleImputer {
                statistics: vec![0.0, 0.0, 0.0],
                feature_names_in: None,
            })
            .with_class_map(ClassMap::default());
        let err = ModelInvoker::new()
            .predict(Some(&artifact), None, &row(None, Some(1.0)))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictionError::TransformFailure {
                source: ClassifierError::DimensionMismatch { .. }
            }
        ));
    }
}
