//! Feature derivation for ML inference
//!
//! Turns raw student indicators into the exact feature row the model
//! expects. Two features are derived on every request: `Status_DEFA`, a
//! three-bucket encoding of the DEFA sign, and `consistencia_acad`, the ratio
//! of IDA to IEG.

use crate::models::{FeatureRow, StudentMetrics};

/// Name of the derived DEFA sign bucket
pub const STATUS_DEFA: &str = "Status_DEFA";

/// Name of the derived IDA / IEG ratio
pub const CONSISTENCIA_ACAD: &str = "consistencia_acad";

/// Offset added to IEG so the ratio never divides by zero
pub const CONSISTENCY_OFFSET: f64 = 0.1;

/// Feature order used when the artifact does not provide one
pub const DEFAULT_FEATURES: [&str; 10] = [
    "IAN",
    "IDA",
    "IEG",
    "IAA",
    "IPS",
    "IPP",
    "IPV",
    "FASE",
    STATUS_DEFA,
    CONSISTENCIA_ACAD,
];

pub fn default_feature_names() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect()
}

/// Builds model feature rows from raw metrics
pub struct FeatureDeriver<'a> {
    feature_names: &'a [String],
}

impl<'a> FeatureDeriver<'a> {
    pub fn new(feature_names: &'a [String]) -> Self {
        Self { feature_names }
    }

    /// Derive the ordered row; names the input cannot supply stay missing
    pub fn derive(&self, metrics: &StudentMetrics) -> FeatureRow {
        let status = status_defa(metrics.defa).map(f64::from);
        let consistency = consistencia_acad(metrics.ida, metrics.ieg);

        let mut row = FeatureRow::new();
        for name in self.feature_names {
            let value = match name.as_str() {
                STATUS_DEFA => status,
                CONSISTENCIA_ACAD => Some(consistency),
                other => metrics.raw(other).filter(|v| v.is_finite()),
            };
            row.push(name.clone(), value);
        }
        row
    }
}

/// Bucket the DEFA sign: behind 0, on track 1, ahead 2
pub fn status_defa(defa: f64) -> Option<u8> {
    if !defa.is_finite() {
        return None;
    }
    Some(if defa < 0.0 {
        0
    } else if defa == 0.0 {
        1
    } else {
        2
    })
}

/// IDA / (IEG + 0.1); missing inputs read as 0.0 and anomalies become 0.0
pub fn consistencia_acad(ida: Option<f64>, ieg: Option<f64>) -> f64 {
    let ida = ida.unwrap_or(0.0);
    let ieg = ieg.unwrap_or(0.0);
    let ratio = ida / (ieg + CONSISTENCY_OFFSET);
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Round DEFA to the nearest integer, ties to even
pub fn defa_to_int(defa: f64) -> i64 {
    if defa.is_finite() {
        defa.round_ties_even() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics(defa: f64) -> StudentMetrics {
        StudentMetrics::from_indicators([5.0, 7.0, 8.0, 6.0, 7.0, 6.5, 7.5], 2, defa)
    }

    #[test]
    fn test_status_defa_buckets() {
        for defa in [-10.0, -2.0, -0.5, -0.001] {
            assert_eq!(status_defa(defa), Some(0), "defa {}", defa);
        }
        assert_eq!(status_defa(0.0), Some(1));
        assert_eq!(status_defa(-0.0), Some(1));
        for defa in [0.001, 0.5, 3.0] {
            assert_eq!(status_defa(defa), Some(2), "defa {}", defa);
        }
        assert_eq!(status_defa(f64::NAN), None);
    }

    #[test]
    fn test_consistencia_acad_value() {
        let ratio = consistencia_acad(Some(7.0), Some(8.0));
        assert!((ratio - 7.0 / 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_consistencia_acad_guards() {
        assert!((consistencia_acad(Some(5.0), Some(0.0)) - 50.0).abs() < 1e-9);
        assert_eq!(consistencia_acad(Some(5.0), Some(-0.1)), 0.0);
        assert_eq!(consistencia_acad(None, None), 0.0);
        assert!((consistencia_acad(Some(1.0), None) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_defa_rounding_half_to_even() {
        assert_eq!(defa_to_int(1.999999), 2);
        assert_eq!(defa_to_int(0.5), 0);
        assert_eq!(defa_to_int(1.5), 2);
        assert_eq!(defa_to_int(2.5), 2);
        assert_eq!(defa_to_int(-0.5), 0);
        assert_eq!(defa_to_int(-1.5), -2);
        assert_eq!(defa_to_int(-2.9), -3);
        assert_eq!(defa_to_int(f64::NAN), 0);
    }

    #[test]
    fn test_derive_default_order() {
        let names = default_feature_names();
        let row = FeatureDeriver::new(&names).derive(&sample_metrics(-1.0));

        assert_eq!(row.names(), names.as_slice());
        assert_eq!(row.get("IAN"), Some(5.0));
        assert_eq!(row.get("FASE"), Some(2.0));
        assert_eq!(row.get(STATUS_DEFA), Some(0.0));
        assert!((row.get(CONSISTENCIA_ACAD).unwrap() - 7.0 / 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_derive_follows_artifact_order_and_marks_unknown_missing() {
        let names: Vec<String> = ["consistencia_acad", "IPV", "INDE", "DEFA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = FeatureDeriver::new(&names).derive(&sample_metrics(1.0));

        assert_eq!(row.len(), 4);
        assert_eq!(row.names()[0], "consistencia_acad");
        assert_eq!(row.get("IPV"), Some(7.5));
        assert!(row.contains("INDE"));
        assert_eq!(row.get("INDE"), None);
        assert_eq!(row.get("DEFA"), Some(1.0));
    }

    #[test]
    fn test_missing_indicator_stays_missing() {
        let mut metrics = sample_metrics(0.0);
        metrics.ieg = None;
        let names = default_feature_names();
        let row = FeatureDeriver::new(&names).derive(&metrics);

        assert_eq!(row.get("IEG"), None);
        // derivation still reads IEG as 0.0
        assert!((row.get(CONSISTENCIA_ACAD).unwrap() - 70.0).abs() < 1e-9);
    }
}
