//! Configuration parsing and validation.
//!
//! The engine is configured via a TOML file (default `./codesearch.toml`).
//! The config defines the Postgres connection, the model provider and its
//! credentials/dimensions, and indexing concurrency tuning. Unset optional
//! fields fall back to the provider's own defaults (see [`crate::model`]).

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// `"openai"`, `"vertex"`, or `"stub"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Escape hatch for corporate TLS-intercepting proxies. Off by default.
    #[serde(default)]
    pub insecure_tls: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            base_url: None,
            project: None,
            location: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            insecure_tls: false,
        }
    }
}

fn default_provider() -> String {
    "stub".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Worker pool size; defaults to `min(available parallelism, 8)`.
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "default_queue_multiplier")]
    pub queue_capacity_multiplier: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            queue_capacity_multiplier: default_queue_multiplier(),
        }
    }
}

fn default_queue_multiplier() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.db.url.trim().is_empty() {
            bail!("db.url must not be empty");
        }
        match self.model.provider.as_str() {
            "openai" | "vertex" | "stub" => {}
            other => bail!("unknown model provider: {other}"),
        }
        if let Some(dims) = self.model.dims {
            if dims == 0 {
                bail!("model.dims must be nonzero when set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let toml = r#"
            [db]
            url = "postgres://localhost/codesearch"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.model.provider, "stub");
        assert_eq!(config.indexing.queue_capacity_multiplier, 2);
        assert_eq!(config.db.max_connections, 10);
    }

    #[test]
    fn empty_db_url_is_rejected() {
        let config = Config {
            db: DbConfig {
                url: "  ".to_string(),
                max_connections: 10,
            },
            model: ModelConfig::default(),
            indexing: IndexingConfig::default(),
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut model = ModelConfig::default();
        model.provider = "bogus".to_string();
        let config = Config {
            db: DbConfig {
                url: "postgres://localhost/x".to_string(),
                max_connections: 10,
            },
            model,
            indexing: IndexingConfig::default(),
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
