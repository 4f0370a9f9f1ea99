//! Prediction orchestration
//!
//! Composes feature derivation, inference, risk scoring, driver estimation
//! and the recommendation rules into a single response. The service holds no
//! per-request state: each call reads one registry snapshot and builds a
//! fresh result from it.

use super::{
    defa_to_int, risk_tier_from_score, round_to, status_defa, DriverEstimator, FeatureDeriver,
    ModelInvoker, RiskScorer, Sanitize,
};
use crate::artifact::ModelRegistry;
use crate::error::PredictionError;
use crate::models::{ClassProbabilities, ClassProbability, PredictionResult, StudentMetrics};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::recommend::{
    EnrichmentContext, EnrichmentRule, RecommendationConfig, RecommendationEngine, RiskInput,
};
use std::sync::Arc;
use std::time::Instant;

/// Label reported when nothing was predicted
pub const UNKNOWN_LABEL: &str = "unknown";

/// Stateless prediction pipeline over a shared model registry
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    invoker: ModelInvoker,
    engine: RecommendationEngine,
    rules: Vec<Box<dyn EnrichmentRule>>,
    metrics: Option<ServiceMetrics>,
    logger: Option<StructuredLogger>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>, config: RecommendationConfig) -> Self {
        let rules = if config.enrichment_enabled {
            crate::recommend::default_rules()
        } else {
            Vec::new()
        };
        Self {
            registry,
            invoker: ModelInvoker::new(),
            engine: RecommendationEngine::new(config),
            rules,
            metrics: None,
            logger: None,
        }
    }

    /// Attach Prometheus metrics and structured event logging
    pub fn with_observability(mut self, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        self.metrics = Some(metrics);
        self.logger = Some(logger);
        self
    }

    /// Replace the enrichment rule set
    pub fn with_rules(mut self, rules: Vec<Box<dyn EnrichmentRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Run the full pipeline for one student
    ///
    /// A missing model yields a degraded result; only a failure of the
    /// fallback transform is returned as an error.
    pub fn predict_score(&self, metrics: &StudentMetrics) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();
        let snapshot = self.registry.snapshot();
        let artifact = snapshot.artifact();
        let stats = snapshot.stats();

        let defa_int = defa_to_int(metrics.defa);
        let row = FeatureDeriver::new(snapshot.feature_names()).derive(metrics);

        let invocation = match self.invoker.predict(artifact, stats, &row) {
            Ok(invocation) => invocation,
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.inc_prediction_errors();
                }
                if let Some(logger) = &self.logger {
                    logger.log_prediction_failed(&e.to_string(), snapshot.model_version());
                }
                return Err(e);
            }
        };

        let class_map = snapshot.class_map();
        let prediction = match invocation.class_index {
            Some(idx) => class_map.label_or_index(idx),
            None => UNKNOWN_LABEL.to_string(),
        };

        let probabilities = invocation
            .probabilities
            .as_deref()
            .map(|probs| {
                ClassProbabilities(
                    probs
                        .iter()
                        .enumerate()
                        .map(|(i, p)| ClassProbability {
                            label: class_map.probability_label(i),
                            probability: Some(*p),
                        })
                        .collect(),
                )
            })
            .unwrap_or_default();

        let risk_score = RiskScorer::new(class_map).score(invocation.probabilities.as_deref());
        let risk = RiskInput::new(artifact.is_some(), risk_score);
        let recommendation =
            self.engine
                .recommend(defa_int, risk, &prediction, metrics.nome.as_deref());

        let importances = snapshot.importances();
        let top_drivers = DriverEstimator::new(stats, importances).top_drivers(&row);

        let context = EnrichmentContext {
            predicted_label: &prediction,
            status_defa: status_defa(metrics.defa),
            metrics,
        };
        let supplementary_flags = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(&context))
            .collect();

        let result = PredictionResult {
            prediction_index: invocation.class_index,
            probabilities,
            risk_score: risk_score.map(|s| round_to(s, 4)),
            risk_tier: risk_score.map(risk_tier_from_score),
            acao_sugerida: recommendation.action,
            suggested_messages: recommendation.messages,
            supplementary_flags,
            top_drivers,
            input_features: row,
            defa_int,
            model_version: snapshot.model_version().to_string(),
            prediction,
        }
        .sanitized();

        if let Some(m) = &self.metrics {
            m.observe_prediction_latency(start.elapsed().as_secs_f64());
            m.inc_predictions_generated();
            if invocation.class_index.is_none() {
                m.inc_degraded_predictions();
            }
            if invocation.used_fallback() {
                m.inc_fallback_predictions();
            }
        }
        if let Some(logger) = &self.logger {
            if invocation.used_fallback() {
                logger.log_prediction_fallback(invocation.strategy.unwrap_or_default());
            }
            logger.log_prediction(&result, start.elapsed().as_micros() as u64);
        }

        Ok(result)
    }
}
