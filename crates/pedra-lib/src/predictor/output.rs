//! Prediction output post-processing
//!
//! Presentation rounding and the sanitizing pass that turns every NaN or
//! infinite number in a result into a null before it leaves the pipeline.

use crate::models::{ClassProbabilities, FeatureRow, PredictionResult, TopDriver};

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Recursively replaces non-finite floats with `None`
pub trait Sanitize {
    fn sanitize(&mut self);

    fn sanitized(mut self) -> Self
    where
        Self: Sized,
    {
        self.sanitize();
        self
    }
}

impl Sanitize for Option<f64> {
    fn sanitize(&mut self) {
        if matches!(self, Some(v) if !v.is_finite()) {
            *self = None;
        }
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        self.iter_mut().for_each(Sanitize::sanitize);
    }
}

impl Sanitize for FeatureRow {
    fn sanitize(&mut self) {
        self.values_mut().iter_mut().for_each(Sanitize::sanitize);
    }
}

impl Sanitize for ClassProbabilities {
    fn sanitize(&mut self) {
        self.0.iter_mut().for_each(|c| c.probability.sanitize());
    }
}

impl Sanitize for TopDriver {
    fn sanitize(&mut self) {
        self.score.sanitize();
        self.z.sanitize();
        self.importance.sanitize();
    }
}

impl Sanitize for PredictionResult {
    fn sanitize(&mut self) {
        self.probabilities.sanitize();
        self.risk_score.sanitize();
        if self.risk_score.is_none() {
            self.risk_tier = None;
        }
        self.top_drivers.sanitize();
        self.input_features.sanitize();
    }
}
