//! API client for the prediction service

use anyhow::{Context, Result};
use pedra_lib::{SuggestedMessages, SupplementaryFlag};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Build a URL from path segments, escaping each one
    pub fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url_for(segments)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.url_for(segments)?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub prediction_index: Option<usize>,
    #[serde(default)]
    pub probabilities: HashMap<String, Option<f64>>,
    pub risk_score: Option<f64>,
    pub risk_tier: Option<String>,
    #[serde(default)]
    pub top_drivers: Vec<Driver>,
    pub acao_sugerida: String,
    pub suggested_messages: SuggestedMessages,
    #[serde(default)]
    pub supplementary_flags: Vec<SupplementaryFlag>,
    pub defa_int: i64,
    pub model_version: String,
}

impl PredictionResponse {
    /// Class probabilities, most likely first
    pub fn ranked_probabilities(&self) -> Vec<(&str, Option<f64>)> {
        let mut ranked: Vec<(&str, Option<f64>)> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.1.unwrap_or(f64::NEG_INFINITY))
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    pub score: Option<f64>,
    pub z: Option<f64>,
    pub importance: Option<f64>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    pub status: String,
    pub model_loaded: bool,
    pub data_loaded: bool,
    pub stats_loaded: bool,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_segments_are_escaped() {
        let client = ApiClient::new("http://localhost:8000/api/").unwrap();
        let url = client.url_for(&["students", "Ana Souza/2"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/students/Ana%20Souza%2F2");
    }

    #[test]
    fn test_ranked_probabilities() {
        let response: PredictionResponse = serde_json::from_value(json!({
            "prediction": "Ametista",
            "prediction_index": 2,
            "probabilities": {"Quartzo": 0.1, "Ágata": 0.2, "Ametista": 0.6, "Topázio": null},
            "risk_score": 0.1,
            "risk_tier": "Baixo",
            "top_drivers": [],
            "acao_sugerida": "Monitoramento e Micro-intervenção",
            "suggested_messages": {"family": "f", "professor": "p"},
            "input_features": {"IAN": 7.0},
            "defa_int": 0,
            "model_version": "v1"
        }))
        .unwrap();

        let labels: Vec<&str> = response.ranked_probabilities().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Ametista", "Ágata", "Quartzo", "Topázio"]);
        assert!(response.supplementary_flags.is_empty());
    }
}
