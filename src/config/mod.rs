//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Research-agent service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL for the agent service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional bearer token for the agent service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Wall-clock budget per research run, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Action budget per research run
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
}

fn default_base_url() -> String {
    "http://localhost:8100".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_max_actions() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            max_actions: default_max_actions(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            agent: AgentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Agent timeout must be greater than 0".to_string(),
            ));
        }

        if self.agent.max_actions == 0 {
            return Err(ConfigError::ValidationError(
                "Agent action budget must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the satellite record store inside the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("satellites.json")
    }
}
