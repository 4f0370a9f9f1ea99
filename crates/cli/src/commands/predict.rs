//! Prediction CLI commands

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pedra_lib::{
    ModelRegistry, PredictionService, RecommendationConfig, RegistryConfig, StudentMetrics,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

use crate::client::{ApiClient, PredictionResponse};
use crate::output::{
    color_risk_tier, format_number, format_probability, print_json, print_warning, OutputFormat,
};

/// Student indicators shared by `predict` and `score`
#[derive(Debug, Clone, Args)]
pub struct IndicatorArgs {
    /// Adequacy to level indicator
    #[arg(long)]
    pub ian: Option<f64>,
    /// Learning indicator
    #[arg(long)]
    pub ida: Option<f64>,
    /// Engagement indicator
    #[arg(long)]
    pub ieg: Option<f64>,
    /// Self-assessment indicator
    #[arg(long)]
    pub iaa: Option<f64>,
    /// Psychosocial indicator
    #[arg(long)]
    pub ips: Option<f64>,
    /// Psychopedagogical indicator
    #[arg(long)]
    pub ipp: Option<f64>,
    /// Turning-point indicator
    #[arg(long)]
    pub ipv: Option<f64>,
    /// Program stage
    #[arg(long)]
    pub fase: Option<i64>,
    /// Grade-level gap, negative means behind
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub defa: f64,
    /// Student name used in the suggested messages
    #[arg(long)]
    pub nome: Option<String>,
}

impl IndicatorArgs {
    pub fn to_metrics(&self) -> StudentMetrics {
        StudentMetrics {
            ian: self.ian,
            ida: self.ida,
            ieg: self.ieg,
            iaa: self.iaa,
            ips: self.ips,
            ipp: self.ipp,
            ipv: self.ipv,
            fase: self.fase,
            defa: self.defa,
            nome: self.nome.clone(),
        }
    }
}

#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Class")]
    label: String,
    #[tabled(rename = "Probability")]
    probability: String,
}

#[derive(Tabled)]
struct DriverRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "z")]
    z: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Request a prediction from the service
pub async fn predict(client: &ApiClient, args: &IndicatorArgs, format: OutputFormat) -> Result<()> {
    let result: Value = client.post(&["predict"], &args.to_metrics()).await?;
    print_prediction(result, format)
}

/// Run the prediction pipeline locally against an artifact on disk
pub fn score(
    args: &IndicatorArgs,
    model: PathBuf,
    data: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let registry = Arc::new(ModelRegistry::new(RegistryConfig {
        model_path: Some(model.clone()),
        data_path: data,
    }));
    let status = registry.load();
    if !status.model_loaded {
        print_warning(&format!(
            "Could not load model from {}, showing the fallback recommendation",
            model.display()
        ));
    }

    let service = PredictionService::new(registry, RecommendationConfig::default());
    let result = service
        .predict_score(&args.to_metrics())
        .context("Prediction failed")?;

    print_prediction(serde_json::to_value(&result)?, format)
}

fn print_prediction(result: Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            let result: PredictionResponse =
                serde_json::from_value(result).context("Unexpected prediction response")?;
            print_prediction_table(&result);
            Ok(())
        }
    }
}

fn print_prediction_table(result: &PredictionResponse) {
    println!("{}", "Prediction".bold());
    println!("{}", "=".repeat(60));
    println!("Class:                  {}", result.prediction.cyan());
    println!(
        "Risk:                   {} ({})",
        format_number(result.risk_score, 4),
        color_risk_tier(result.risk_tier.as_deref())
    );
    println!("DEFA:                   {}", result.defa_int);
    println!("Model Version:          {}", result.model_version);
    println!();

    if !result.probabilities.is_empty() {
        let rows: Vec<ProbabilityRow> = result
            .ranked_probabilities()
            .into_iter()
            .map(|(label, p)| ProbabilityRow {
                label: label.to_string(),
                probability: format_probability(p),
            })
            .collect();
        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
        println!();
    }

    if !result.top_drivers.is_empty() {
        println!("{}", "Top Drivers".bold());
        let rows: Vec<DriverRow> = result
            .top_drivers
            .iter()
            .map(|d| DriverRow {
                feature: d.feature.clone(),
                score: format_number(d.score, 3),
                z: format_number(d.z, 3),
                importance: format_number(d.importance, 3),
            })
            .collect();
        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
        println!();
    }

    println!("{}", "Recommendation".bold());
    println!("{}", "-".repeat(60));
    println!("Action:    {}", result.acao_sugerida.green().bold());
    println!("Family:    {}", result.suggested_messages.family);
    println!("Professor: {}", result.suggested_messages.professor);

    for flag in &result.supplementary_flags {
        println!();
        println!("{} {}", "Profile:".bold(), flag.perfil.yellow());
        println!("  {}", flag.acao);
    }
}
