//! Service status CLI commands

use anyhow::Result;
use colored::Colorize;
use pedra_lib::ModelStatus;

use crate::client::{ApiClient, HealthSummary};
use crate::output::{color_loaded, color_status, print_json, print_success, OutputFormat};

/// Show what the service has loaded
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: HealthSummary = client.get(&["health"]).await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", "Service Status".bold());
            println!("{}", "=".repeat(50));
            println!("Status:                 {}", color_status(&status.status));
            println!("Model:                  {}", color_loaded(status.model_loaded));
            println!("Dataset:                {}", color_loaded(status.data_loaded));
            println!("Statistics:             {}", color_loaded(status.stats_loaded));
            println!("Model Version:          {}", status.model_version.cyan());
        }
    }

    Ok(())
}

/// Ask the service to reload its artifact and dataset
pub async fn reload_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: ModelStatus = client.post(&["model", "reload"], &serde_json::json!({})).await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            print_success(&format!("Registry reloaded, model version {}", status.model_version));
            println!("Model:                  {}", color_loaded(status.model_loaded));
            println!("Dataset:                {}", color_loaded(status.data_loaded));
            println!("Statistics:             {}", color_loaded(status.stats_loaded));
            if let Some(sha) = &status.artifact_sha256 {
                println!("Artifact SHA-256:       {}", sha);
            }
            println!("Features:               {}", status.feature_names.join(", "));
        }
    }

    Ok(())
}
