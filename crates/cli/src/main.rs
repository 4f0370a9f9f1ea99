//! Pedra Conceito CLI
//!
//! A command-line client for the prediction service, plus an offline
//! `score` command that runs the pipeline against a local artifact.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{predict, status, students};
use std::path::PathBuf;

/// Pedra Conceito CLI
#[derive(Parser)]
#[command(name = "pedra")]
#[command(author, version, about = "CLI for the Pedra Conceito prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PEDRA_API_URL env var)
    #[arg(long, env = "PEDRA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the concept stone and recommendation for a student
    Predict(predict::IndicatorArgs),

    /// Score a student offline with a local model artifact
    Score {
        #[command(flatten)]
        indicators: predict::IndicatorArgs,

        /// Model artifact (JSON)
        #[arg(long, env = "PEDRA_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Reference student dataset (CSV)
        #[arg(long, env = "PEDRA_DATA_PATH")]
        data: Option<PathBuf>,
    },

    /// Show the recorded history of a student
    Student {
        /// Student name (exact match first, then substring)
        name: String,
    },

    /// Show what the service has loaded
    Status,

    /// Reload the model artifact and dataset on the service
    Reload,

    /// Store defaults in ~/.config/pedra/config.json
    Configure {
        /// Default API endpoint URL
        #[arg(long)]
        api_url: Option<String>,

        /// Default model artifact for `score`
        #[arg(long)]
        model: Option<PathBuf>,

        /// Default dataset for `score`
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::Config::load()?;

    let api_url = settings.resolve_api_url(cli.api_url);

    match cli.command {
        Commands::Predict(args) => {
            let client = client::ApiClient::new(&api_url)?;
            predict::predict(&client, &args, cli.format).await?;
        }
        Commands::Score {
            indicators,
            model,
            data,
        } => {
            let model = model
                .or_else(|| settings.model_path.clone())
                .context("No model artifact given (use --model or `pedra configure --model`)")?;
            let data = data.or_else(|| settings.data_path.clone());
            predict::score(&indicators, model, data, cli.format)?;
        }
        Commands::Student { name } => {
            let client = client::ApiClient::new(&api_url)?;
            students::show_student(&client, &name, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&api_url)?;
            status::show_status(&client, cli.format).await?;
        }
        Commands::Reload => {
            let client = client::ApiClient::new(&api_url)?;
            status::reload_model(&client, cli.format).await?;
        }
        Commands::Configure {
            api_url,
            model,
            data,
        } => {
            if api_url.is_none() && model.is_none() && data.is_none() {
                output::print_info(&format!(
                    "API URL: {}",
                    settings.api_url.as_deref().unwrap_or(config::DEFAULT_API_URL)
                ));
                output::print_info(&format!("Model:   {:?}", settings.model_path));
                output::print_info(&format!("Data:    {:?}", settings.data_path));
                return Ok(());
            }

            if let Some(url) = api_url {
                url::Url::parse(&url).context("Invalid API URL")?;
                settings.api_url = Some(url);
            }
            if model.is_some() {
                settings.model_path = model;
            }
            if data.is_some() {
                settings.data_path = data;
            }
            let path = settings.save()?;
            output::print_success(&format!("Saved configuration to {}", path.display()));
        }
    }

    Ok(())
}
