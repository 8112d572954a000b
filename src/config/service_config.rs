//! Request limits and sentiment backend selection.

use super::parse_or;
use anyhow::{Result, ensure};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which sentiment analyzer serves the text endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBackend {
    Keyword,
    Classifier,
}

impl FromStr for SentimentBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(SentimentBackend::Keyword),
            "classifier" => Ok(SentimentBackend::Classifier),
            _ => anyhow::bail!(
                "Invalid SENTIMENT_BACKEND: {}. Must be 'keyword' or 'classifier'",
                s
            ),
        }
    }
}

impl fmt::Display for SentimentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Classifier => write!(f, "classifier"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceEnvConfig {
    pub min_price_points: usize,
    pub default_prediction_days: usize,
    pub max_prediction_days: usize,
    pub max_concurrent_trainings: usize,
    pub training_queue_timeout_secs: u64,
    pub max_headlines: usize,
    pub sentiment_backend: SentimentBackend,
}

impl Default for ServiceEnvConfig {
    fn default() -> Self {
        Self {
            min_price_points: 40,
            default_prediction_days: 7,
            max_prediction_days: 30,
            max_concurrent_trainings: 2,
            training_queue_timeout_secs: 30,
            max_headlines: 20,
            sentiment_backend: SentimentBackend::Classifier,
        }
    }
}

impl ServiceEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sentiment_backend = match lookup("SENTIMENT_BACKEND") {
            Some(raw) => SentimentBackend::from_str(&raw)?,
            None => defaults.sentiment_backend,
        };

        let config = Self {
            min_price_points: parse_or(&lookup, "MIN_PRICE_POINTS", defaults.min_price_points)?,
            default_prediction_days: parse_or(
                &lookup,
                "DEFAULT_PREDICTION_DAYS",
                defaults.default_prediction_days,
            )?,
            max_prediction_days: parse_or(
                &lookup,
                "MAX_PREDICTION_DAYS",
                defaults.max_prediction_days,
            )?,
            max_concurrent_trainings: parse_or(
                &lookup,
                "MAX_CONCURRENT_TRAININGS",
                defaults.max_concurrent_trainings,
            )?,
            training_queue_timeout_secs: parse_or(
                &lookup,
                "TRAINING_QUEUE_TIMEOUT_SECS",
                defaults.training_queue_timeout_secs,
            )?,
            max_headlines: parse_or(&lookup, "MAX_HEADLINES", defaults.max_headlines)?,
            sentiment_backend,
        };

        ensure!(
            config.max_concurrent_trainings > 0,
            "MAX_CONCURRENT_TRAININGS must be positive"
        );
        ensure!(
            (1..=config.max_prediction_days).contains(&config.default_prediction_days),
            "DEFAULT_PREDICTION_DAYS must be within 1..={}",
            config.max_prediction_days
        );
        Ok(config)
    }

    pub fn training_queue_timeout(&self) -> Duration {
        Duration::from_secs(self.training_queue_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceEnvConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.min_price_points, 40);
        assert_eq!(config.default_prediction_days, 7);
        assert_eq!(config.max_headlines, 20);
        assert_eq!(config.sentiment_backend, SentimentBackend::Classifier);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!(
            SentimentBackend::from_str("Keyword").unwrap(),
            SentimentBackend::Keyword
        );
        assert!(SentimentBackend::from_str("finbert").is_err());

        let config = ServiceEnvConfig::from_lookup(|key| {
            (key == "SENTIMENT_BACKEND").then(|| "keyword".to_string())
        })
        .unwrap();
        assert_eq!(config.sentiment_backend, SentimentBackend::Keyword);
    }

    #[test]
    fn test_default_days_must_fit_max() {
        let result = ServiceEnvConfig::from_lookup(|key| match key {
            "DEFAULT_PREDICTION_DAYS" => Some("40".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }
}
