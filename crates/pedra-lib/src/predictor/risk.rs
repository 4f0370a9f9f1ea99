//! Reduction of class probabilities to a scalar risk score

use crate::artifact::ClassMap;
use crate::models::RiskTier;

/// Map a risk score to its tier; lower bounds are inclusive
pub fn risk_tier_from_score(score: f64) -> RiskTier {
    if score >= 0.75 {
        RiskTier::Critico
    } else if score >= 0.50 {
        RiskTier::Alto
    } else if score >= 0.25 {
        RiskTier::Moderado
    } else {
        RiskTier::Baixo
    }
}

/// Computes the risk score for one artifact's class layout
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    quartzo_index: Option<usize>,
}

impl RiskScorer {
    pub fn new(class_map: &ClassMap) -> Self {
        Self {
            quartzo_index: class_map.quartzo_index(),
        }
    }

    /// Probability of the lowest tier, or a rank-weighted average
    ///
    /// Without a "quartzo" class, class `i` of `n` is weighted by
    /// `1 - i/(n-1)` (normalized), so lower indices count as riskier.
    pub fn score(&self, probabilities: Option<&[f64]>) -> Option<f64> {
        let probs = probabilities.filter(|p| !p.is_empty())?;

        if let Some(idx) = self.quartzo_index.filter(|i| *i < probs.len()) {
            return Some(probs[idx]).filter(|p| p.is_finite());
        }

        let n = probs.len();
        if n == 1 {
            return Some(probs[0]).filter(|p| p.is_finite());
        }

        let weights: Vec<f64> = (0..n).map(|i| 1.0 - i as f64 / (n - 1) as f64).collect();
        let total: f64 = weights.iter().sum();
        let score: f64 = probs
            .iter()
            .zip(&weights)
            .map(|(p, w)| p * w / total)
            .sum();
        Some(score).filter(|s| s.is_finite())
    }

    pub fn tier(&self, probabilities: Option<&[f64]>) -> Option<RiskTier> {
        self.score(probabilities).map(risk_tier_from_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gem_map() -> ClassMap {
        ClassMap::from_labels(["Quartzo", "Ágata", "Ametista", "Topázio"])
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(risk_tier_from_score(0.8), RiskTier::Critico);
        assert_eq!(risk_tier_from_score(0.6), RiskTier::Alto);
        assert_eq!(risk_tier_from_score(0.3), RiskTier::Moderado);
        assert_eq!(risk_tier_from_score(0.1), RiskTier::Baixo);
    }

    #[test]
    fn test_tier_boundaries_inclusive() {
        assert_eq!(risk_tier_from_score(0.75), RiskTier::Critico);
        assert_eq!(risk_tier_from_score(0.50), RiskTier::Alto);
        assert_eq!(risk_tier_from_score(0.25), RiskTier::Moderado);
        assert_eq!(risk_tier_from_score(0.0), RiskTier::Baixo);
        assert_eq!(risk_tier_from_score(1.0), RiskTier::Critico);
    }

    #[test]
    fn test_no_probabilities() {
        let scorer = RiskScorer::new(&gem_map());
        assert_eq!(scorer.score(None), None);
        assert_eq!(scorer.score(Some(&[])), None);
    }

    #[test]
    fn test_quartzo_probability_used_directly() {
        let map = ClassMap::from_pairs([(2, " QUARTZO "), (0, "Topázio"), (1, "Ágata")]);
        let scorer = RiskScorer::new(&map);
        assert_eq!(scorer.score(Some(&[0.1, 0.2, 0.7])), Some(0.7));
    }

    #[test]
    fn test_quartzo_index_out_of_range_falls_back() {
        let map = ClassMap::from_pairs([(5, "Quartzo")]);
        let scorer = RiskScorer::new(&map);
        // weights 1, 0 normalized
        assert_eq!(scorer.score(Some(&[0.3, 0.7])), Some(0.3));
    }

    #[test]
    fn test_weighted_average_without_quartzo() {
        let scorer = RiskScorer::new(&ClassMap::default());
        // weights 1, 2/3, 1/3, 0 normalized by 2
        let score = scorer.score(Some(&[0.25, 0.25, 0.25, 0.25])).unwrap();
        assert!((score - 0.25).abs() < 1e-12);

        let score = scorer.score(Some(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_class() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.score(Some(&[0.9])), Some(0.9));
    }

    #[test]
    fn test_nan_probability_yields_none() {
        let scorer = RiskScorer::new(&gem_map());
        assert_eq!(scorer.score(Some(&[f64::NAN, 0.5, 0.3, 0.2])), None);
        assert_eq!(scorer.tier(Some(&[0.8, 0.1, 0.05, 0.05])), Some(RiskTier::Critico));
    }
}
