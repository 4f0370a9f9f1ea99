//! Service configuration

use anyhow::{Context, Result};
use pedra_lib::{RecommendationConfig, RegistryConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "PEDRA_CONFIG";

const ENV_PREFIX: &str = "PEDRA";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Instance name attached to every structured log event
    pub instance_name: String,

    /// Address the HTTP server binds to
    pub host: String,

    pub port: u16,

    /// JSON model artifact
    pub model_path: Option<PathBuf>,

    /// Reference student CSV
    pub data_path: Option<PathBuf>,

    /// Reload the registry when the artifact file changes
    pub watch_model: bool,

    /// CORS origins, `*` allows any
    pub allowed_origins: Vec<String>,

    pub recommendation: RecommendationConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "pedra-service".to_string())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: Some(PathBuf::from("models/model.json")),
            data_path: Some(PathBuf::from("data/students.csv")),
            watch_model: false,
            allowed_origins: vec!["*".to_string()],
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional file in `PEDRA_CONFIG` and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::from_sources(file.as_deref())
    }

    /// Layer defaults, an optional file and `PEDRA_*` environment variables
    ///
    /// Nested keys use a double underscore, e.g.
    /// `PEDRA_RECOMMENDATION__LARGE_DEFA_THRESHOLD=3`.
    pub fn from_sources(file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("allowed_origins")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .with_context(|| format!("Failed to read configuration (file: {:?})", file))?;
        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            model_path: self.model_path.clone(),
            data_path: self.data_path.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.allowed_origins, vec!["*"]);
        assert!(!config.watch_model);
        assert_eq!(config.recommendation, RecommendationConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 9100
model_path = "/srv/pedra/model.json"
watch_model = true

[recommendation]
large_defa_threshold = 3
enrichment_enabled = false
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = ServiceConfig::from_sources(Some(&path)).unwrap();

        assert_eq!(config.port, 9100);
        assert!(config.watch_model);
        assert_eq!(
            config.registry_config().model_path,
            Some(PathBuf::from("/srv/pedra/model.json"))
        );
        // untouched keys keep their defaults
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.recommendation.large_defa_threshold, 3);
        assert!(!config.recommendation.enrichment_enabled);
        assert_eq!(config.recommendation.review_risk_threshold, 0.75);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ServiceConfig::from_sources(Some("/nonexistent/pedra.toml")).is_err());
    }
}
