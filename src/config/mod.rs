//! Configuration module for MarketSense.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Model, Service limits, and Server.

mod model_config;
mod server_config;
mod service_config;

pub use model_config::ModelEnvConfig;
pub use server_config::{LogFormat, ServerEnvConfig};
pub use service_config::{SentimentBackend, ServiceEnvConfig};

use anyhow::{Context, Result};
use std::str::FromStr;

/// Parse `key` through `lookup`, falling back to `default` when unset.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub model: ModelEnvConfig,
    pub service: ServiceEnvConfig,
    pub server: ServerEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            model: ModelEnvConfig::from_env().context("Failed to load model config")?,
            service: ServiceEnvConfig::from_env().context("Failed to load service config")?,
            server: ServerEnvConfig::from_env().context("Failed to load server config")?,
        })
    }
}
