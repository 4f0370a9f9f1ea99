//! Heuristic ranking of the features behind a prediction
//!
//! Each feature scores `|z| * importance`, where `z` is the deviation from
//! the reference median in units of the reference std (or the raw value
//! when no statistics exist). This is a rough signal for humans, not an
//! attribution method: it ignores interactions and is not SHAP-equivalent.

use super::output::round_to;
use crate::models::{FeatureRow, TopDriver};
use crate::store::FeatureStats;
use std::collections::HashMap;

/// Number of drivers reported
pub const MAX_DRIVERS: usize = 2;

pub struct DriverEstimator<'a> {
    stats: Option<&'a FeatureStats>,
    importances: Option<&'a HashMap<String, f64>>,
}

impl<'a> DriverEstimator<'a> {
    pub fn new(
        stats: Option<&'a FeatureStats>,
        importances: Option<&'a HashMap<String, f64>>,
    ) -> Self {
        Self { stats, importances }
    }

    fn z_score(&self, feature: &str, value: f64) -> f64 {
        let stats = self
            .stats
            .and_then(|s| Some((s.median(feature)?, s.std(feature)?)));
        let z = match stats {
            Some((median, std)) => {
                let std = if std == 0.0 || !std.is_finite() { 1.0 } else { std };
                (value - median) / std
            }
            None => value,
        };
        if z.is_finite() {
            z
        } else {
            0.0
        }
    }

    fn importance(&self, feature: &str) -> f64 {
        match self.importances {
            Some(map) => map.get(feature).copied().unwrap_or(0.0),
            None => 1.0,
        }
    }

    /// Top features by contribution; ties keep row order
    pub fn top_drivers(&self, row: &FeatureRow) -> Vec<TopDriver> {
        let mut contributions: Vec<(&str, f64, f64, f64)> = row
            .iter()
            .filter_map(|(name, value)| {
                let value = value.filter(|v| v.is_finite())?;
                let z = self.z_score(name, value);
                let importance = self.importance(name);
                Some((name, z.abs() * importance, z, importance))
            })
            .collect();

        contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        contributions
            .into_iter()
            .take(MAX_DRIVERS)
            .map(|(feature, score, z, importance)| TopDriver {
                feature: feature.to_string(),
                score: Some(round_to(score, 6)),
                z: Some(round_to(z, 3)),
                importance: Some(round_to(importance, 6)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[(&str, Option<f64>)]) -> FeatureRow {
        let mut row = FeatureRow::new();
        for (name, value) in values {
            row.push(*name, *value);
        }
        row
    }

    #[test]
    fn test_raw_values_without_stats() {
        let r = row(&[("IAN", Some(2.0)), ("IDA", Some(-9.0)), ("IEG", Some(5.0))]);
        let drivers = DriverEstimator::new(None, None).top_drivers(&r);

        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].feature, "IDA");
        assert_eq!(drivers[0].score, Some(9.0));
        assert_eq!(drivers[0].z, Some(-9.0));
        assert_eq!(drivers[0].importance, Some(1.0));
        assert_eq!(drivers[1].feature, "IEG");
    }

    #[test]
    fn test_z_scores_with_stats() {
        let stats = FeatureStats::from_maps(
            HashMap::from([("IAN".to_string(), 5.0), ("IDA".to_string(), 6.0)]),
            HashMap::from([("IAN".to_string(), 2.0), ("IDA".to_string(), 0.0)]),
        );
        let r = row(&[("IAN", Some(9.0)), ("IDA", Some(7.5)), ("FASE", Some(1.0))]);
        let drivers = DriverEstimator::new(Some(&stats), None).top_drivers(&r);

        // IAN z = 2, IDA z = 1.5 with std floored to 1, FASE raw = 1
        assert_eq!(drivers[0].feature, "IAN");
        assert_eq!(drivers[0].z, Some(2.0));
        assert_eq!(drivers[1].feature, "IDA");
        assert_eq!(drivers[1].z, Some(1.5));
    }

    #[test]
    fn test_importances_weight_scores() {
        let importances = HashMap::from([("IAN".to_string(), 0.1), ("IDA".to_string(), 0.9)]);
        let r = row(&[("IAN", Some(8.0)), ("IDA", Some(2.0)), ("IEG", Some(100.0))]);
        let drivers = DriverEstimator::new(None, Some(&importances)).top_drivers(&r);

        assert_eq!(drivers[0].feature, "IDA");
        assert_eq!(drivers[0].score, Some(1.8));
        assert_eq!(drivers[1].feature, "IAN");
        // IEG has no importance entry and scores zero
        assert!(drivers.iter().all(|d| d.feature != "IEG"));
    }

    #[test]
    fn test_missing_values_skipped_and_ties_stable() {
        let r = row(&[("A", None), ("B", Some(3.0)), ("C", Some(-3.0)), ("D", Some(3.0))]);
        let drivers = DriverEstimator::new(None, None).top_drivers(&r);
        let names: Vec<_> = drivers.iter().map(|d| d.feature.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_rounding() {
        let r = row(&[("A", Some(1.23456789))]);
        let drivers = DriverEstimator::new(None, None).top_drivers(&r);
        assert_eq!(drivers[0].z, Some(1.235));
        assert_eq!(drivers[0].score, Some(1.234568));
    }
}
