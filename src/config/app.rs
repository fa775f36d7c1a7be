//! Application configuration loading from config.toml
//!
//! The file lists the fare stages to seed and tunes the HTTP server, the rollover
//! cascade and the simulated payment gateway. Every section except `stages` is
//! optional and falls back to the defaults below.

use crate::{
    core::{rollover::DEFAULT_PAGE_SIZE, stage::StageFees},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// HTTP listener and public URL
    #[serde(default)]
    pub server: ServerConfig,
    /// Cascade tuning
    #[serde(default)]
    pub rollover: RolloverConfig,
    /// Simulated gateway behaviour
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Fare stages to seed into the database
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// `[server]` section
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Base URL embedded in verification links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// `[rollover]` section
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RolloverConfig {
    /// Passes expired per cascade batch
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for RolloverConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// `[gateway]` section
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct GatewayConfig {
    /// Whether the simulated gateway approves charges
    #[serde(default = "default_approve")]
    pub approve: bool,
    /// Artificial latency per charge, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            approve: true,
            delay_ms: 0,
        }
    }
}

const fn default_approve() -> bool {
    true
}

/// Configuration for a single fare stage
#[derive(Debug, Deserialize, Clone)]
pub struct StageConfig {
    /// Stage name students register against
    pub name: String,
    /// Full-year fee
    pub full_fee: f64,
    /// First-semester installment
    pub installment1: f64,
    /// Second-semester installment
    pub installment2: f64,
}

impl AppConfig {
    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rollover.page_size == 0 {
            return Err(Error::Config {
                message: "rollover.page_size must be at least 1".to_string(),
            });
        }

        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(Error::Config {
                    message: "stage name cannot be empty".to_string(),
                });
            }
            StageFees {
                full_fee: stage.full_fee,
                installment1: stage.installment1,
                installment2: stage.installment2,
            }
            .validate()
            .map_err(|e| Error::Config {
                message: format!("stage '{}': {e}", stage.name),
            })?;
        }

        Ok(())
    }
}

/// Loads and validates the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A stage's fees are inconsistent
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;

    info!(
        path = %path.as_ref().display(),
        stages = config.stages.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Loads the configuration from `CONFIG_PATH`, or ./config.toml when unset
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
