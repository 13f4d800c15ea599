//! Run configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable limits for a translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Candidate texts sent to the provider per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Admission limit: runs finding more candidates than this fail
    /// before any provider call.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
    /// HTTP provider request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Translation endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_cells: default_max_cells(),
            timeout_secs: default_timeout_secs(),
            endpoint: None,
        }
    }
}

fn default_batch_size() -> usize {
    50
}

fn default_max_cells() -> usize {
    5000
}

fn default_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_cells, 5000);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RunConfig = toml::from_str("batch_size = 10").unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_cells, 5000);
    }

    #[test]
    fn test_full_toml() {
        let config: RunConfig = toml::from_str(
            r#"
            batch_size = 25
            max_cells = 100
            timeout_secs = 5
            endpoint = "http://localhost:8080/translate"
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_cells, 100);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://localhost:8080/translate")
        );
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(RunConfig::from_file("/no/such/xlate.toml").is_err());
    }
}
