//! Core data models for the prediction service

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical names of the seven indicator scores
pub const INDICATORS: [&str; 7] = ["IAN", "IDA", "IEG", "IAA", "IPS", "IPP", "IPV"];

/// Raw student indicators as received from callers
///
/// Indicators and FASE are optional on the wire: an absent field is carried
/// as a missing value and filled later by the imputer or the median fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentMetrics {
    #[serde(rename = "IAN", default)]
    pub ian: Option<f64>,
    #[serde(rename = "IDA", default)]
    pub ida: Option<f64>,
    #[serde(rename = "IEG", default)]
    pub ieg: Option<f64>,
    #[serde(rename = "IAA", default)]
    pub iaa: Option<f64>,
    #[serde(rename = "IPS", default)]
    pub ips: Option<f64>,
    #[serde(rename = "IPP", default)]
    pub ipp: Option<f64>,
    #[serde(rename = "IPV", default)]
    pub ipv: Option<f64>,
    /// Integral floats such as `2.0` are accepted
    #[serde(rename = "FASE", default, deserialize_with = "whole_number")]
    pub fase: Option<i64>,
    /// Signed grade-level offset, negative means behind
    #[serde(rename = "DEFA", default)]
    pub defa: f64,
    /// Student name, only used for lookup and message personalisation
    #[serde(rename = "NOME", default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WholeNumber {
    Int(i64),
    Float(f64),
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<WholeNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(WholeNumber::Int(n)) => Ok(Some(n)),
        Some(WholeNumber::Float(f))
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            Ok(Some(f as i64))
        }
        Some(WholeNumber::Float(f)) => Err(D::Error::custom(format!(
            "invalid value: {}, expected a whole number",
            f
        ))),
    }
}

impl StudentMetrics {
    /// Build metrics from the seven indicators in canonical order
    pub fn from_indicators(indicators: [f64; 7], fase: i64, defa: f64) -> Self {
        let [ian, ida, ieg, iaa, ips, ipp, ipv] = indicators;
        Self {
            ian: Some(ian),
            ida: Some(ida),
            ieg: Some(ieg),
            iaa: Some(iaa),
            ips: Some(ips),
            ipp: Some(ipp),
            ipv: Some(ipv),
            fase: Some(fase),
            defa,
            nome: None,
        }
    }

    /// Look up a raw field by its wire name
    pub fn raw(&self, name: &str) -> Option<f64> {
        match name {
            "IAN" => self.ian,
            "IDA" => self.ida,
            "IEG" => self.ieg,
            "IAA" => self.iaa,
            "IPS" => self.ips,
            "IPP" => self.ipp,
            "IPV" => self.ipv,
            "FASE" => self.fase.map(|f| f as f64),
            "DEFA" => Some(self.defa),
            _ => None,
        }
    }
}

/// Ordered feature row exactly as handed to the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    names: Vec<String>,
    values: Vec<Option<f64>>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.names.push(name.into());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value for a feature; `None` when absent or missing
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values[i])
    }

    /// Whether the row has a column with this name, missing or not
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Dense numeric view, missing values become NaN
    pub fn to_dense(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Option<f64>] {
        &mut self.values
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Class label and probability pair
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbability {
    pub label: String,
    pub probability: Option<f64>,
}

/// Class probabilities ordered by class index, serialized as a label map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassProbabilities(pub Vec<ClassProbability>);

impl ClassProbabilities {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|c| c.label == label)
            .and_then(|c| c.probability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassProbability> {
        self.0.iter()
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.label, &entry.probability)?;
        }
        map.end()
    }
}

/// Discrete risk bucket derived from the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Crítico")]
    Critico,
    #[serde(rename = "Alto")]
    Alto,
    #[serde(rename = "Moderado")]
    Moderado,
    #[serde(rename = "Baixo")]
    Baixo,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Critico => "Crítico",
            RiskTier::Alto => "Alto",
            RiskTier::Moderado => "Moderado",
            RiskTier::Baixo => "Baixo",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the heuristic driver ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDriver {
    pub feature: String,
    pub score: Option<f64>,
    pub z: Option<f64>,
    pub importance: Option<f64>,
}

/// Audience-specific recommendation texts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedMessages {
    pub family: String,
    pub professor: String,
}

/// Supplementary profile flag produced by an enrichment rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryFlag {
    pub perfil: String,
    pub acao: String,
}

/// Full response of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub prediction_index: Option<usize>,
    pub probabilities: ClassProbabilities,
    pub risk_score: Option<f64>,
    pub risk_tier: Option<RiskTier>,
    pub acao_sugerida: String,
    pub suggested_messages: SuggestedMessages,
    pub supplementary_flags: Vec<SupplementaryFlag>,
    pub top_drivers: Vec<TopDriver>,
    pub input_features: FeatureRow,
    pub defa_int: i64,
    pub model_version: String,
}

/// Read-only view of what the service currently has loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub data_loaded: bool,
    pub stats_loaded: bool,
    pub model_version: String,
    pub artifact_sha256: Option<String>,
    pub feature_names: Vec<String>,
}

/// Cell of the student history projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

/// One historical record of a student
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct HistoryEntry {
    pub ano: Option<CellValue>,
    pub fase: Option<CellValue>,
    pub ian: Option<CellValue>,
    pub ida: Option<CellValue>,
    pub ieg: Option<CellValue>,
    pub iaa: Option<CellValue>,
    pub ips: Option<CellValue>,
    pub ipp: Option<CellValue>,
    pub ipv: Option<CellValue>,
    pub defa: Option<CellValue>,
}

/// Lookup result for a student name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentHistory {
    pub nome: Option<String>,
    pub historico: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accept_missing_fields() {
        let metrics: StudentMetrics =
            serde_json::from_str(r#"{"IAN": 5.0, "FASE": 2}"#).unwrap();
        assert_eq!(metrics.ian, Some(5.0));
        assert_eq!(metrics.ida, None);
        assert_eq!(metrics.fase, Some(2));
        assert_eq!(metrics.defa, 0.0);
    }

    #[test]
    fn test_fase_accepts_integral_floats() {
        let metrics: StudentMetrics =
            serde_json::from_str(r#"{"IAN": 5, "FASE": 2.0, "DEFA": 0}"#).unwrap();
        assert_eq!(metrics.fase, Some(2));
        assert_eq!(metrics.ian, Some(5.0));

        let metrics: StudentMetrics = serde_json::from_str(r#"{"FASE": null}"#).unwrap();
        assert_eq!(metrics.fase, None);

        assert!(serde_json::from_str::<StudentMetrics>(r#"{"FASE": 2.5}"#).is_err());
        assert!(serde_json::from_str::<StudentMetrics>(r#"{"FASE": "2"}"#).is_err());
        assert!(serde_json::from_str::<StudentMetrics>(r#"{"FASE": 1e300}"#).is_err());
    }

    #[test]
    fn test_metrics_reject_wrong_types() {
        assert!(serde_json::from_str::<StudentMetrics>(r#"{"IAN": "x"}"#).is_err());
        assert!(serde_json::from_str::<StudentMetrics>(r#"{"DEFA": {}}"#).is_err());
    }

    #[test]
    fn test_feature_row_serializes_in_order() {
        let mut row = FeatureRow::new();
        row.push("IEG", Some(1.5));
        row.push("IAN", None);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"IEG":1.5,"IAN":null}"#);
        assert!(row.contains("IAN"));
        assert_eq!(row.get("IAN"), None);
        assert!(row.to_dense()[1].is_nan());
    }

    #[test]
    fn test_risk_tier_wire_names() {
        assert_eq!(serde_json::to_string(&RiskTier::Critico).unwrap(), "\"Crítico\"");
        assert_eq!(RiskTier::Baixo.to_string(), "Baixo");
    }

    #[test]
    fn test_history_entry_uppercase_keys() {
        let entry = HistoryEntry {
            ano: Some(CellValue::Integer(2022)),
            defa: Some(CellValue::Number(-1.0)),
            ..Default::default()
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ANO"], 2022);
        assert_eq!(json["DEFA"], -1.0);
        assert!(json["IAN"].is_null());
    }
}
