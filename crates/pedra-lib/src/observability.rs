//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcome counters, model version)
//! - Structured JSON logging with tracing

use crate::models::{ModelStatus, PredictionResult};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_generated: IntCounter,
    degraded_predictions: IntCounter,
    fallback_predictions: IntCounter,
    prediction_errors: IntCounter,
    model_reloads: IntCounter,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "pedra_prediction_latency_seconds",
                "Time spent running the full prediction pipeline",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_generated: register_int_counter!(
                "pedra_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            degraded_predictions: register_int_counter!(
                "pedra_degraded_predictions_total",
                "Predictions served without a loaded model"
            )
            .expect("Failed to register degraded_predictions_total"),

            fallback_predictions: register_int_counter!(
                "pedra_fallback_predictions_total",
                "Predictions that needed the impute and scale fallback"
            )
            .expect("Failed to register fallback_predictions_total"),

            prediction_errors: register_int_counter!(
                "pedra_prediction_errors_total",
                "Predictions that failed after the fallback transform"
            )
            .expect("Failed to register prediction_errors_total"),

            model_reloads: register_int_counter!(
                "pedra_model_reloads_total",
                "Number of model artifact reloads"
            )
            .expect("Failed to register model_reloads_total"),

            model_version_info: register_gauge_vec!(
                "pedra_model_version_info",
                "Information about the currently loaded model artifact",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_generated(&self) {
        self.inner().predictions_generated.inc();
    }

    pub fn inc_degraded_predictions(&self) {
        self.inner().degraded_predictions.inc();
    }

    pub fn inc_fallback_predictions(&self) {
        self.inner().fallback_predictions.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_model_reloads(&self) {
        self.inner().model_reloads.inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult, latency_us: u64) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            prediction = %result.prediction,
            risk_score = ?result.risk_score,
            risk_tier = ?result.risk_tier.map(|t| t.as_str()),
            action = %result.acao_sugerida,
            defa_int = result.defa_int,
            flags = result.supplementary_flags.len(),
            model_version = %result.model_version,
            latency_us = latency_us,
            "Generated prediction"
        );
    }

    pub fn log_prediction_fallback(&self, strategy: &str) {
        info!(
            event = "prediction_fallback",
            instance = %self.instance,
            strategy = %strategy,
            "Direct prediction failed, served through fallback"
        );
    }

    pub fn log_prediction_failed(&self, error: &str, model_version: &str) {
        error!(
            event = "prediction_failed",
            instance = %self.instance,
            error = %error,
            model_version = %model_version,
            "Prediction failed on server"
        );
    }

    pub fn log_model_loaded(&self, status: &ModelStatus) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_version = %status.model_version,
            sha256 = ?status.artifact_sha256,
            features = status.feature_names.len(),
            data_loaded = status.data_loaded,
            stats_loaded = status.stats_loaded,
            "Model artifact loaded"
        );
    }

    pub fn log_model_load_failed(&self, path: &str, error: &str) {
        warn!(
            event = "model_load_failed",
            instance = %self.instance,
            path = %path,
            error = %error,
            "Failed to load model artifact"
        );
    }

    pub fn log_model_reloaded(&self, old_version: &str, status: &ModelStatus) {
        info!(
            event = "model_reloaded",
            instance = %self.instance,
            old_version = %old_version,
            new_version = %status.model_version,
            model_loaded = status.model_loaded,
            data_loaded = status.data_loaded,
            "Model registry reloaded"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = %model_version,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
