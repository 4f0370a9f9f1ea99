//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as a percentage, `-` when absent
pub fn format_probability(probability: Option<f64>) -> String {
    match probability {
        Some(p) => format!("{:.1}%", p * 100.0),
        None => "-".to_string(),
    }
}

/// Format an optional number with a fixed precision
pub fn format_number(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

/// Color a risk tier by severity
pub fn color_risk_tier(tier: Option<&str>) -> String {
    match tier {
        Some(t @ "Crítico") => t.red().bold().to_string(),
        Some(t @ "Alto") => t.red().to_string(),
        Some(t @ "Moderado") => t.yellow().to_string(),
        Some(t @ "Baixo") => t.green().to_string(),
        Some(t) => t.to_string(),
        None => "-".dimmed().to_string(),
    }
}

/// Color a loaded/missing flag
pub fn color_loaded(loaded: bool) -> String {
    if loaded {
        "loaded".green().to_string()
    } else {
        "missing".yellow().to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" | "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "error" => status.red().to_string(),
        _ => status.to_string(),
    }
}
