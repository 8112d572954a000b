//! Forecast model and training configuration parsing from environment variables.

use super::parse_or;
use crate::application::ml::network::NetworkConfig;
use anyhow::{Context, Result, ensure};
use std::env;

/// Model hyperparameters and training budget
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    // Windowing
    pub sequence_length: usize,

    // Optimisation
    pub max_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub early_stopping_patience: usize,
    pub lr_plateau_patience: usize,
    pub grad_clip_norm: f64,

    // Architecture
    pub hidden_size: usize,
    pub dropout: f32,
    pub attention_heads: usize,

    // Budget
    pub max_training_secs: u64,
    pub training_seed: Option<u64>,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            max_epochs: 80,
            batch_size: 16,
            learning_rate: 0.001,
            weight_decay: 0.01,
            early_stopping_patience: 20,
            lr_plateau_patience: 10,
            grad_clip_norm: 1.0,
            hidden_size: 64,
            dropout: 0.3,
            attention_heads: 8,
            max_training_secs: 120,
            training_seed: None,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let training_seed = match lookup("TRAINING_SEED") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse TRAINING_SEED")?,
            ),
            _ => None,
        };

        let config = Self {
            sequence_length: parse_or(&lookup, "SEQUENCE_LENGTH", defaults.sequence_length)?,
            max_epochs: parse_or(&lookup, "MAX_EPOCHS", defaults.max_epochs)?,
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size)?,
            learning_rate: parse_or(&lookup, "LEARNING_RATE", defaults.learning_rate)?,
            weight_decay: parse_or(&lookup, "WEIGHT_DECAY", defaults.weight_decay)?,
            early_stopping_patience: parse_or(
                &lookup,
                "EARLY_STOPPING_PATIENCE",
                defaults.early_stopping_patience,
            )?,
            lr_plateau_patience: parse_or(
                &lookup,
                "LR_PLATEAU_PATIENCE",
                defaults.lr_plateau_patience,
            )?,
            grad_clip_norm: parse_or(&lookup, "GRAD_CLIP_NORM", defaults.grad_clip_norm)?,
            hidden_size: parse_or(&lookup, "HIDDEN_SIZE", defaults.hidden_size)?,
            dropout: parse_or(&lookup, "DROPOUT", defaults.dropout)?,
            attention_heads: parse_or(&lookup, "ATTENTION_HEADS", defaults.attention_heads)?,
            max_training_secs: parse_or(&lookup, "MAX_TRAINING_SECS", defaults.max_training_secs)?,
            training_seed,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.sequence_length > 0, "SEQUENCE_LENGTH must be positive");
        ensure!(self.max_epochs > 0, "MAX_EPOCHS must be positive");
        ensure!(self.batch_size > 0, "BATCH_SIZE must be positive");
        ensure!(
            self.learning_rate > 0.0 && self.learning_rate.is_finite(),
            "LEARNING_RATE must be a positive number"
        );
        ensure!(self.grad_clip_norm > 0.0, "GRAD_CLIP_NORM must be positive");
        self.network_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid network config: {}", e))
    }

    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            hidden_size: self.hidden_size,
            attention_heads: self.attention_heads,
            dropout: self.dropout,
            ..NetworkConfig::default()
        }
    }
}
