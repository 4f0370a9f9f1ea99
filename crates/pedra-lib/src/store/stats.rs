//! Per-feature population statistics

use super::StudentStore;
use std::collections::HashMap;
use tracing::debug;

/// Medians and standard deviations of the model features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureStats {
    medians: HashMap<String, f64>,
    stds: HashMap<String, f64>,
}

impl FeatureStats {
    pub fn from_maps(medians: HashMap<String, f64>, stds: HashMap<String, f64>) -> Self {
        Self { medians, stds }
    }

    /// Compute statistics for the listed features present in the roster
    ///
    /// Standard deviations are sample deviations (n - 1); a zero or
    /// undefined deviation is stored as 1.0. Returns `None` when no listed
    /// feature has numeric data.
    pub fn compute(store: &StudentStore, features: &[String]) -> Option<Self> {
        let mut stats = Self::default();
        for name in features {
            let Some(mut values) = store.numeric_column(name) else {
                continue;
            };
            let Some(median) = median(&mut values) else {
                continue;
            };
            let std = sample_std(&values)
                .filter(|s| *s != 0.0 && s.is_finite())
                .unwrap_or(1.0);
            stats.medians.insert(name.clone(), median);
            stats.stds.insert(name.clone(), std);
        }

        if stats.is_empty() {
            debug!("No reference statistics available for model features");
            None
        } else {
            debug!(features = stats.medians.len(), "Computed reference statistics");
            Some(stats)
        }
    }

    pub fn median(&self, feature: &str) -> Option<f64> {
        self.medians.get(feature).copied()
    }

    pub fn std(&self, feature: &str) -> Option<f64> {
        self.stds.get(feature).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.medians.is_empty()
    }

    pub fn len(&self) -> usize {
        self.medians.len()
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}
