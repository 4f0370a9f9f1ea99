//! Core library for the Pedra Conceito prediction service
//!
//! This crate provides:
//! - Feature derivation and resilient model invocation
//! - Risk scoring, driver ranking and rule-based recommendations
//! - Model artifact loading with atomic hot reload
//! - The reference student dataset and its statistics
//! - Health checks and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod recommend;
pub mod store;

pub use artifact::{ModelArtifact, ModelRegistry, RegistryConfig};
pub use error::{ArtifactError, ClassifierError, LookupError, PredictionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::PredictionService;
pub use recommend::RecommendationConfig;
pub use store::{FeatureStats, StudentStore};
