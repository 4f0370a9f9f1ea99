//! Student lookup CLI commands

use anyhow::Result;
use colored::Colorize;
use pedra_lib::{CellValue, HistoryEntry, StudentHistory};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_warning, OutputFormat};

/// Row for the history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Year")]
    ano: String,
    #[tabled(rename = "Stage")]
    fase: String,
    #[tabled(rename = "IAN")]
    ian: String,
    #[tabled(rename = "IDA")]
    ida: String,
    #[tabled(rename = "IEG")]
    ieg: String,
    #[tabled(rename = "IAA")]
    iaa: String,
    #[tabled(rename = "IPS")]
    ips: String,
    #[tabled(rename = "IPP")]
    ipp: String,
    #[tabled(rename = "IPV")]
    ipv: String,
    #[tabled(rename = "DEFA")]
    defa: String,
}

fn cell(value: &Option<CellValue>) -> String {
    match value {
        Some(CellValue::Integer(i)) => i.to_string(),
        Some(CellValue::Number(n)) => format!("{:.2}", n),
        Some(CellValue::Text(t)) => t.clone(),
        None => "-".to_string(),
    }
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            ano: cell(&entry.ano),
            fase: cell(&entry.fase),
            ian: cell(&entry.ian),
            ida: cell(&entry.ida),
            ieg: cell(&entry.ieg),
            iaa: cell(&entry.iaa),
            ips: cell(&entry.ips),
            ipp: cell(&entry.ipp),
            ipv: cell(&entry.ipv),
            defa: cell(&entry.defa),
        }
    }
}

/// Show the recorded history of a student
pub async fn show_student(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let result: StudentHistory = client.get(&["students", name]).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Student History".bold());
            println!("{}", "=".repeat(60));
            println!(
                "Name: {}",
                result.nome.as_deref().unwrap_or(name).cyan()
            );
            println!();

            if result.historico.is_empty() {
                print_warning("No records found for this student");
                return Ok(());
            }

            let rows: Vec<HistoryRow> = result.historico.iter().map(HistoryRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} records", result.historico.len());
        }
    }

    Ok(())
}
