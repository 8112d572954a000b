use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round to `dp` decimal places, half-to-even on the exact binary value of `value`.
///
/// Non-finite inputs are returned unchanged.
pub fn round_to(value: f64, dp: u32) -> f64 {
    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
            .to_f64()
            .unwrap_or(value),
        None => value,
    }
}

/// One day of the forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    /// Percent, within [35, 92]
    pub confidence: f64,
    /// Sentiment confidence boost in percentage points
    pub sentiment_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi: f64,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub current_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactStrength {
    Low,
    Medium,
    High,
}

impl ImpactStrength {
    pub fn from_correlation(correlation: f64) -> Self {
        let abs = correlation.abs();
        if abs > 0.5 {
            Self::High
        } else if abs > 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ImpactStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentImpact {
    pub correlation: f64,
    pub impact_strength: ImpactStrength,
    pub analysis: String,
    pub data_points: usize,
}

/// Diagnostics about the model trained for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model_type: String,
    pub architecture: String,
    pub training_data_points: usize,
    pub sentiment_data_points: usize,
    pub sequence_length: usize,
    pub prediction_horizon: usize,
    pub features_used: Vec<String>,
    pub epochs_trained: usize,
    pub final_loss: f64,
    pub stopped_early: bool,
    pub training_duration_ms: u64,
    pub training_timestamp: DateTime<Utc>,
}

/// Everything produced for a single ticker forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub ticker: String,
    pub predictions: Vec<ForecastDay>,
    pub technical_indicators: TechnicalIndicators,
    pub sentiment_analysis: SentimentImpact,
    pub model_metrics: ModelMetrics,
}
