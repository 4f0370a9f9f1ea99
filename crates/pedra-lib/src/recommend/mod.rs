//! Rule-based pedagogical recommendations
//!
//! The primary action comes from a fixed decision table over the rounded
//! DEFA, the risk score and the predicted class. Supplementary profile flags
//! come from independent [`EnrichmentRule`]s and never change the action.

mod enrichment;
mod messages;

pub use enrichment::{
    default_rules, AcademicRiskRule, CriticalGapRule, DisengagedRule, EnrichmentContext,
    EnrichmentRule, TopTierPotentialRule,
};
pub use messages::{
    render, MessageCatalog, RecommendationConfig, DEFAULT_LARGE_DEFA_THRESHOLD,
    DEFAULT_REVIEW_RISK_THRESHOLD, DEFAULT_STUDENT_NAME,
};

use crate::artifact::is_top_tier;
use crate::models::{RiskTier, SuggestedMessages};
use crate::predictor::risk_tier_from_score;

/// Action labels produced by the rule table
pub mod actions {
    pub const SEVERE_RECOVERY: &str = "Recuperação Intensiva (grave)";
    pub const RECOVERY: &str = "Recuperação de Aprendizagem";
    pub const HIGH_ENRICHMENT: &str = "Aprofundamento / Enriquecimento (alto)";
    pub const MODERATE_ENRICHMENT: &str = "Enriquecimento Curricular (moderado)";
    pub const REVIEW_SUFFIX: &str = " + Revisão";
    pub const PSYCHOPEDAGOGICAL: &str = "Intervenção Psicopedagógica";
    pub const INTENSIVE_FOLLOW_UP: &str = "Acompanhamento Intensivo";
    pub const ENRICHMENT: &str = "Enriquecimento Curricular";
    pub const MICRO_INTERVENTION: &str = "Monitoramento e Micro-intervenção";
    pub const MONITORING: &str = "Monitoramento";
}

/// Suggested action with its audience-specific texts
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub action: String,
    pub messages: SuggestedMessages,
}

impl Recommendation {
    fn new(action: &str, messages: SuggestedMessages) -> Self {
        Self {
            action: action.to_string(),
            messages,
        }
    }
}

/// What the model contributed to a recommendation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskInput {
    /// No artifact loaded
    NoModel,
    /// A model ran but its output gave no finite score
    Undetermined,
    Score(f64),
}

impl RiskInput {
    pub fn new(model_loaded: bool, score: Option<f64>) -> Self {
        match (model_loaded, score) {
            (_, Some(score)) if score.is_finite() => Self::Score(score),
            (true, _) => Self::Undetermined,
            (false, _) => Self::NoModel,
        }
    }

    pub fn score(self) -> Option<f64> {
        match self {
            Self::Score(score) => Some(score),
            _ => None,
        }
    }
}

/// Deterministic recommendation rule table
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub fn recommend(
        &self,
        defa_int: i64,
        risk: RiskInput,
        predicted_label: &str,
        student_name: Option<&str>,
    ) -> Recommendation {
        let catalog = &self.config.messages;
        let threshold = self.config.large_defa_threshold;
        let lower = threshold.saturating_neg();
        let nome = student_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.config.default_student_name.as_str());
        let text = |template: &SuggestedMessages| render(template, defa_int, nome);

        if defa_int < 0 {
            return if defa_int <= lower {
                Recommendation::new(actions::SEVERE_RECOVERY, text(&catalog.severe_gap))
            } else {
                Recommendation::new(actions::RECOVERY, text(&catalog.gap))
            };
        }

        if defa_int > 0 {
            let mut rec = if defa_int >= threshold {
                Recommendation::new(actions::HIGH_ENRICHMENT, text(&catalog.far_ahead))
            } else {
                Recommendation::new(actions::MODERATE_ENRICHMENT, text(&catalog.ahead))
            };
            // being ahead does not hide a high predicted risk
            if risk.score().is_some_and(|r| r >= self.config.review_risk_threshold) {
                let note = text(&catalog.review_note);
                rec.action.push_str(actions::REVIEW_SUFFIX);
                rec.messages.family.push_str(&note.family);
                rec.messages.professor.push_str(&note.professor);
            }
            return rec;
        }

        let score = match risk {
            RiskInput::Score(score) => score,
            RiskInput::Undetermined => {
                return Recommendation::new(actions::MICRO_INTERVENTION, text(&catalog.routine))
            }
            RiskInput::NoModel => {
                return Recommendation::new(actions::MONITORING, text(&catalog.model_unavailable))
            }
        };

        match risk_tier_from_score(score) {
            RiskTier::Critico => {
                Recommendation::new(actions::PSYCHOPEDAGOGICAL, text(&catalog.critical_risk))
            }
            RiskTier::Alto => {
                Recommendation::new(actions::INTENSIVE_FOLLOW_UP, text(&catalog.high_risk))
            }
            _ if is_top_tier(predicted_label) => {
                Recommendation::new(actions::ENRICHMENT, text(&catalog.top_tier))
            }
            _ => Recommendation::new(actions::MICRO_INTERVENTION, text(&catalog.routine)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RecommendationEngine {
        RecommendationEngine::default()
    }

    fn action(defa: i64, risk: Option<f64>, label: &str) -> String {
        engine()
            .recommend(defa, RiskInput::new(risk.is_some(), risk), label, None)
            .action
    }

    #[test]
    fn test_behind_grade() {
        for defa in [-3, -10, -100, -2] {
            assert_eq!(action(defa, Some(0.1), "Topázio"), actions::SEVERE_RECOVERY);
        }
        assert_eq!(action(-1, Some(0.9), "Quartzo"), actions::RECOVERY);
        assert_eq!(action(-1, None, "unknown"), actions::RECOVERY);
    }

    #[test]
    fn test_ahead_of_grade() {
        for defa in [2, 5, 100] {
            assert!(action(defa, Some(0.1), "x").starts_with(actions::HIGH_ENRICHMENT));
        }
        assert_eq!(action(1, Some(0.5), "x"), actions::MODERATE_ENRICHMENT);
        assert_eq!(action(1, None, "x"), actions::MODERATE_ENRICHMENT);
    }

    #[test]
    fn test_review_flag_for_risky_ahead_students() {
        let rec = engine().recommend(2, RiskInput::Score(0.75), "Quartzo", Some("Ana"));
        assert_eq!(rec.action, "Aprofundamento / Enriquecimento (alto) + Revisão");
        assert_eq!(
            rec.messages.family,
            "Ana está adiantado (DEFA=2). Sugerimos aprofundamento/possível aceleração. (Nota: modelo indica risco; revisar caso.)"
        );
        assert!(rec.messages.professor.ends_with(" (Rever indicador de risco.)"));

        let rec = engine().recommend(1, RiskInput::Score(0.7499), "Quartzo", None);
        assert_eq!(rec.action, actions::MODERATE_ENRICHMENT);
        assert!(rec.messages.family.starts_with("O aluno está ligeiramente adiantado (DEFA=1)."));
    }

    #[test]
    fn test_on_track_follows_risk_tier() {
        assert_eq!(action(0, Some(0.8), "Topázio"), actions::PSYCHOPEDAGOGICAL);
        assert_eq!(action(0, Some(0.5), "Topázio"), actions::INTENSIVE_FOLLOW_UP);
        assert_eq!(action(0, Some(0.3), " topazio "), actions::ENRICHMENT);
        assert_eq!(action(0, Some(0.3), "Ametista"), actions::MICRO_INTERVENTION);
        assert_eq!(action(0, Some(0.0), "Ágata"), actions::MICRO_INTERVENTION);
    }

    #[test]
    fn test_no_score_means_monitoring() {
        let rec = engine().recommend(0, RiskInput::NoModel, "Topázio", None);
        assert_eq!(rec.action, actions::MONITORING);
        assert!(rec.messages.family.starts_with("Sem modelo disponível"));
    }

    #[test]
    fn test_undetermined_score_is_routine_not_missing_model() {
        let rec = engine().recommend(0, RiskInput::Undetermined, "unknown", None);
        assert_eq!(rec.action, actions::MICRO_INTERVENTION);
        assert!(!rec.messages.family.starts_with("Sem modelo disponível"));

        assert_eq!(RiskInput::new(true, Some(f64::NAN)), RiskInput::Undetermined);
        assert_eq!(RiskInput::new(false, None), RiskInput::NoModel);
        assert_eq!(RiskInput::new(true, Some(0.4)), RiskInput::Score(0.4));

        let rec = engine().recommend(2, RiskInput::Undetermined, "unknown", None);
        assert_eq!(rec.action, actions::HIGH_ENRICHMENT);
    }

    #[test]
    fn test_extreme_threshold_does_not_overflow() {
        let engine = RecommendationEngine::new(RecommendationConfig {
            large_defa_threshold: i64::MIN,
            ..Default::default()
        });
        assert_eq!(
            engine.recommend(-1, RiskInput::NoModel, "", None).action,
            actions::SEVERE_RECOVERY
        );
        assert_eq!(
            engine.recommend(1, RiskInput::NoModel, "", None).action,
            actions::HIGH_ENRICHMENT
        );
    }

    #[test]
    fn test_gap_messages_embed_defa() {
        let rec = engine().recommend(-3, RiskInput::NoModel, "unknown", None);
        assert_eq!(
            rec.messages.family,
            "Detectamos defasagem grave (DEFA=-3). Requer reunião imediata com coordenação."
        );
    }

    #[test]
    fn test_configurable_thresholds() {
        let engine = RecommendationEngine::new(RecommendationConfig {
            large_defa_threshold: 3,
            review_risk_threshold: 0.5,
            default_student_name: "A aluna".to_string(),
            ..Default::default()
        });
        assert_eq!(engine.recommend(-2, RiskInput::NoModel, "", None).action, actions::RECOVERY);
        assert_eq!(engine.recommend(-3, RiskInput::NoModel, "", None).action, actions::SEVERE_RECOVERY);

        let rec = engine.recommend(2, RiskInput::Score(0.6), "", None);
        assert_eq!(rec.action, "Enriquecimento Curricular (moderado) + Revisão");
        assert!(rec.messages.family.starts_with("A aluna"));
    }
}
