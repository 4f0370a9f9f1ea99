//! Reference student dataset
//!
//! A CSV roster with one row per student and year. It backs the name lookup
//! and provides the population statistics used by the driver heuristic.

mod stats;

pub use stats::FeatureStats;

use crate::error::LookupError;
use crate::models::{CellValue, HistoryEntry, StudentHistory};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Column holding the student name
pub const NAME_COLUMN: &str = "NOME";

/// In-memory copy of the roster
#[derive(Debug, Clone, Default)]
pub struct StudentStore {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl StudentStore {
    /// Load a roster from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        let store = Self::from_reader(file)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
        info!(
            path = %path.display(),
            rows = store.len(),
            columns = store.headers.len(),
            "Loaded student dataset"
        );
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Finite numeric values of a column; blanks and text are skipped
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| self.cell(row, Some(idx)))
                .filter_map(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect(),
        )
    }

    /// History of the students matching `name`
    ///
    /// Exact case-insensitive matches win; otherwise every row whose name
    /// contains `name` (case-insensitive) is returned.
    pub fn search_by_name(&self, name: &str) -> Result<StudentHistory, LookupError> {
        let name_idx = self
            .column_index(NAME_COLUMN)
            .ok_or(LookupError::MissingNameColumn)?;
        let needle = name.trim().to_lowercase();

        let name_of = |row: &Vec<String>| self.cell(row, Some(name_idx)).map(str::to_lowercase);

        let mut matches: Vec<&Vec<String>> = self
            .rows
            .iter()
            .filter(|row| name_of(*row).as_deref() == Some(needle.as_str()))
            .collect();

        if matches.is_empty() {
            matches = self
                .rows
                .iter()
                .filter(|row| name_of(*row).is_some_and(|n| n.contains(&needle)))
                .collect();
        }

        let first = matches.first().ok_or(LookupError::NotFound)?;
        let nome = self.cell(first, Some(name_idx)).map(str::to_string);

        let historico = matches.iter().map(|row| self.history_entry(row)).collect();
        Ok(StudentHistory { nome, historico })
    }

    fn history_entry(&self, row: &[String]) -> HistoryEntry {
        let field = |column: &str| self.cell(row, self.column_index(column)).and_then(parse_cell);
        HistoryEntry {
            ano: field("ANO"),
            fase: field("FASE"),
            ian: field("IAN"),
            ida: field("IDA"),
            ieg: field("IEG"),
            iaa: field("IAA"),
            ips: field("IPS"),
            ipp: field("IPP"),
            ipv: field("IPV"),
            defa: field("DEFA"),
        }
    }
}

fn parse_cell(raw: &str) -> Option<CellValue> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(CellValue::Integer(i));
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(CellValue::Number(f)),
        Ok(_) => None,
        Err(_) => Some(CellValue::Text(raw.to_string())),
    }
}
