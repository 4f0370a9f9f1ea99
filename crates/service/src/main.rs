//! Pedra Conceito prediction service
//!
//! Loads the model artifact and the reference student dataset, then serves
//! predictions, student lookups and operational endpoints over HTTP.

use anyhow::Result;
use pedra_lib::{
    artifact::ArtifactWatcher,
    observability::{ServiceMetrics, StructuredLogger},
    ModelRegistry, PredictionService,
};
use pedra_service::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pedra-service");

    let config = ServiceConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_path = ?config.model_path,
        data_path = ?config.data_path,
        "Service configured"
    );

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Artifact and CSV parsing are blocking; failures degrade instead of aborting
    let registry = Arc::new(
        ModelRegistry::new(config.registry_config())
            .with_observability(metrics.clone(), logger.clone()),
    );
    let status = {
        let registry = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || registry.load()).await?
    };

    let service = PredictionService::new(Arc::clone(&registry), config.recommendation.clone())
        .with_observability(metrics, logger.clone());

    let _watcher = match (&config.model_path, config.watch_model) {
        (Some(path), true) => {
            let watcher = ArtifactWatcher::new(Arc::clone(&registry), path.clone());
            match watcher.start().await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "Artifact watcher disabled");
                    None
                }
            }
        }
        _ => None,
    };

    logger.log_startup(SERVICE_VERSION, &status.model_version);

    let app_state = Arc::new(api::AppState::new(service));

    // Mark service as ready after initialization
    app_state.health_registry.set_ready(true);

    let shutdown_logger = logger.clone();
    api::serve(
        &config.bind_addr(),
        app_state,
        &config.allowed_origins,
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            shutdown_logger.log_shutdown("SIGINT received");
        },
    )
    .await?;

    info!("Shutting down");

    Ok(())
}
