//! Detector service configuration

use anyhow::{Context, Result};
use detector_lib::anomaly::{DEFAULT_CONSISTENCY_CONSTANT, DEFAULT_THRESHOLD};
use detector_lib::{ScorerConfig, DEFAULT_METRICS};
use serde::Deserialize;

/// Environment variable prefix for all settings
const ENV_PREFIX: &str = "DETECTOR";

/// Optional config file (any format the `config` crate understands)
const CONFIG_FILE_VAR: &str = "DETECTOR_CONFIG_FILE";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name attached to every log line
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the detection, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Metrics scored per reading, in reporting order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_consistency_constant")]
    pub consistency_constant: f64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_consistency_constant() -> f64 {
    DEFAULT_CONSISTENCY_CONSTANT
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            max_body_bytes: default_max_body_bytes(),
            metrics: default_metrics(),
            threshold: default_threshold(),
            consistency_constant: default_consistency_constant(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_VAR).ok();
        Self::load_from(Self::environment(), file.as_deref())
    }

    /// Environment source; `DETECTOR_METRICS` is a comma separated list
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("metrics")
    }

    /// Load from explicit sources; environment values override the file
    pub fn load_from(env: config::Environment, file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read detector configuration")?;

        config
            .try_deserialize()
            .context("Invalid detector configuration")
    }

    /// Scorer settings carried by this configuration
    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            metrics: self.metrics.clone(),
            threshold: self.threshold,
            consistency_constant: self.consistency_constant,
        }
    }
}
