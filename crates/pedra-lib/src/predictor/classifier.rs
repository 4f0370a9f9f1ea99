//! Native classifiers and preprocessing transforms
//!
//! These mirror the shapes a trained bundle ships with: a multinomial linear
//! model, a mean/median imputer, a standard scaler and a pipeline chaining
//! the three.

use super::Classifier;
use crate::error::ClassifierError;
use crate::models::FeatureRow;
use serde::Deserialize;

/// Multinomial logistic model: softmax over `W · x + b`
///
/// A single coefficient row is read as a binary model (sigmoid, two classes).
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

impl LinearClassifier {
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Result<Self, String> {
        let model = Self {
            coefficients,
            intercepts,
            feature_importances: None,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_importances(mut self, importances: Vec<f64>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    /// Check matrix shapes once at load time
    pub fn validate(&self) -> Result<(), String> {
        let width = match self.coefficients.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err("coefficients must be a non-empty matrix".to_string()),
        };
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err("coefficient rows have different lengths".to_string());
        }
        if self.intercepts.len() != self.coefficients.len() {
            return Err(format!(
                "{} intercepts for {} coefficient rows",
                self.intercepts.len(),
                self.coefficients.len()
            ));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }
}

impl Classifier for LinearClassifier {
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        let expected = self.n_features();
        if row.len() != expected {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                actual: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::MissingValues);
        }

        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, bias)| {
                weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + bias
            })
            .collect();

        if logits.len() == 1 {
            let p = 1.0 / (1.0 + (-logits[0]).exp());
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&logits))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

/// Replaces missing values with per-column statistics
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleImputer {
    pub statistics: Vec<f64>,
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
}

impl SimpleImputer {
    /// Reorder a row to the column order seen at fit time
    ///
    /// Returns `None` when the imputer has no names or the row lacks one of
    /// them; callers then fall back to positional values.
    pub fn align(&self, row: &FeatureRow) -> Option<Vec<f64>> {
        let names = self.feature_names_in.as_ref()?;
        names
            .iter()
            .map(|name| {
                if row.contains(name) {
                    Some(row.get(name).unwrap_or(f64::NAN))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if values.len() != self.statistics.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.statistics.len(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(&self.statistics)
            .map(|(v, fill)| if v.is_finite() { *v } else { *fill })
            .collect())
    }
}

/// Centers and scales columns: `(x - mean) / scale`
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        for params in [&self.mean, &self.scale].into_iter().flatten() {
            if params.len() != values.len() {
                return Err(ClassifierError::DimensionMismatch {
                    expected: params.len(),
                    actual: values.len(),
                });
            }
        }

        Ok(values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mean = self.mean.as_ref().map(|m| m[i]).unwrap_or(0.0);
                // zero-variance columns keep unit scale
                let scale = self
                    .scale
                    .as_ref()
                    .map(|s| s[i])
                    .filter(|s| *s != 0.0)
                    .unwrap_or(1.0);
                (v - mean) / scale
            })
            .collect())
    }
}

/// A self-contained pipeline that imputes and scales before predicting
pub struct PipelineClassifier {
    imputer: Option<SimpleImputer>,
    scaler: Option<StandardScaler>,
    inner: Box<dyn Classifier>,
}

impl PipelineClassifier {
    pub fn new(
        imputer: Option<SimpleImputer>,
        scaler: Option<StandardScaler>,
        inner: Box<dyn Classifier>,
    ) -> Self {
        Self {
            imputer,
            scaler,
            inner,
        }
    }
}

impl Classifier for PipelineClassifier {
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        let mut values = row.to_vec();
        if let Some(imputer) = &self.imputer {
            values = imputer.transform(&values)?;
        }
        if let Some(scaler) = &self.scaler {
            values = scaler.transform(&values)?;
        }
        self.inner.predict_proba(&values)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.inner.feature_importances()
    }

    fn kind(&self) -> &'static str {
        "pipeline"
    }
}

/// Stable softmax; saturated logits share the mass, NaN logits poison the row
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() && !logits.iter().any(|l| l.is_nan()) {
        let top = logits.iter().filter(|l| **l == max).count() as f64;
        return logits
            .iter()
            .map(|l| if *l == max { 1.0 / top } else { 0.0 })
            .collect();
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}
