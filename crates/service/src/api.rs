//! HTTP API for predictions, student lookup, model status and operations endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pedra_lib::{
    health::HealthRegistry, LookupError, ModelRegistry, ModelStatus, PredictionError,
    PredictionResult, PredictionService, StudentHistory, StudentMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    /// Health is reported over the same registry the service predicts from
    pub fn new(service: PredictionService) -> Self {
        let health_registry = HealthRegistry::new(Arc::clone(service.registry()));
        Self {
            service,
            health_registry,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.service.registry()
    }
}

/// Errors surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Prediction(e) => {
                error!(error = %e, "Prediction request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed on server".to_string(),
                )
            }
            ApiError::Lookup(LookupError::DataUnavailable) => {
                (StatusCode::SERVICE_UNAVAILABLE, LookupError::DataUnavailable.to_string())
            }
            ApiError::Lookup(e) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Summary returned by `GET /health`
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub model_loaded: bool,
    pub data_loaded: bool,
    pub stats_loaded: bool,
    pub model_version: String,
}

impl From<ModelStatus> for ServiceHealth {
    fn from(status: ModelStatus) -> Self {
        Self {
            status: "ok",
            model_loaded: status.model_loaded,
            data_loaded: status.data_loaded,
            stats_loaded: status.stats_loaded,
            model_version: status.model_version,
        }
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(metrics): Json<StudentMetrics>,
) -> Result<Json<PredictionResult>, ApiError> {
    let result = state.service.predict_score(&metrics)?;
    Ok(Json(result))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<ServiceHealth> {
    Json(state.registry().status().into())
}

async fn student(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<StudentHistory>, ApiError> {
    let history = state.registry().search_student(&name)?;
    Ok(Json(history))
}

async fn reload_model(State(state): State<Arc<AppState>>) -> Result<Json<ModelStatus>, ApiError> {
    let registry = Arc::clone(state.registry());
    let status = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {e}")))?;

    info!(model_version = %status.model_version, "Reload requested over HTTP");
    Ok(Json(status))
}

/// Health check response; a degraded service still answers 200
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.health_registry.health()))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/students/:name", get(student))
        .route("/model/reload", post(reload_model))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// CORS policy for the configured origins
///
/// An empty list or a `*` entry allows any origin. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(
    addr: &str,
    state: Arc<AppState>,
    allowed_origins: &[String],
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins));

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
