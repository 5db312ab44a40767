//! Scorer configuration.
//!
//! Loaded from a YAML settings file; every field is optional and falls back
//! to a documented default, so an absent or partial file still yields a
//! usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

/// Judge endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key sent as a bearer token. Local vLLM-style servers ignore it.
    #[serde(default = "default_key")]
    pub key: String,
    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name passed through to the endpoint.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature for the verdict token.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_key() -> String {
    "EMPTY".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_model() -> String {
    "qwen3-4b".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    tracing::info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("{:#}, using defaults", e);
                    Config::default()
                }
            }
        } else {
            tracing::info!("no config file at {}, using defaults", path.display());
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let api = ApiConfig::default();
        assert_eq!(api.key, "EMPTY");
        assert_eq!(api.base_url, "http://localhost:8000/v1");
        assert_eq!(api.model, "qwen3-4b");
        assert_eq!(api.temperature, 0.3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_yaml::from_str("api:\n  model: llama3.1-8b\n").unwrap();
        assert_eq!(config.api.model, "llama3.1-8b");
        assert_eq!(config.api.base_url, "http://localhost:8000/v1");
        assert_eq!(config.api.temperature, 0.3);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.api.key, "EMPTY");
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "api:\n  key: secret\n  base_url: http://10.0.0.2:8000/v1\n  temperature: 0.0"
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.key, "secret");
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000/v1");
        assert_eq!(config.api.temperature, 0.0);
        assert_eq!(config.api.model, "qwen3-4b");
    }
}
