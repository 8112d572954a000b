//! Wire formats for the HTTP and Lambda entry points.

use crate::application::analysis::HeadlineAnalysis;
use crate::application::prediction_service::PredictionRequest;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{PredictionReport, TechnicalIndicators};
use crate::domain::market::{NEUTRAL_SENTIMENT, PricePoint, SentimentPoint};
use crate::domain::sentiment::SentimentLabel;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A price entry: either `{"close": 175.4, "date": "2025-07-01"}` or a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Observation {
        #[serde(alias = "price")]
        close: f64,
        #[serde(default)]
        date: Option<String>,
    },
}

/// Accepts `YYYY-MM-DD` or any ISO timestamp starting with it.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ForecastError> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ForecastError::Validation(format!("invalid date '{}'", raw)))
}

impl PriceInput {
    pub fn into_point(self) -> Result<PricePoint, ForecastError> {
        match self {
            PriceInput::Number(close) => Ok(PricePoint::new(close)),
            PriceInput::Observation { close, date } => Ok(PricePoint {
                date: date.as_deref().map(parse_date).transpose()?,
                close,
            }),
        }
    }
}

fn price_points(inputs: Vec<PriceInput>) -> Result<Vec<PricePoint>, ForecastError> {
    inputs.into_iter().map(PriceInput::into_point).collect()
}

/// Missing fields default to the neutral entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentInput {
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub news_count: Option<f64>,
    #[serde(default)]
    pub buzz_score: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
}

impl SentimentInput {
    pub fn into_point(self) -> Result<SentimentPoint, ForecastError> {
        let news_count = match self.news_count {
            Some(n) if !n.is_finite() || n < 0.0 => {
                return Err(ForecastError::Validation(format!(
                    "news_count must be a non-negative number, got {}",
                    n
                )));
            }
            Some(n) => n.round().min(f64::from(u32::MAX)) as u32,
            None => NEUTRAL_SENTIMENT.news_count,
        };

        Ok(SentimentPoint {
            date: self.date.as_deref().map(parse_date).transpose()?,
            sentiment_score: self
                .sentiment_score
                .unwrap_or(NEUTRAL_SENTIMENT.sentiment_score),
            news_count,
            buzz_score: self.buzz_score.unwrap_or(NEUTRAL_SENTIMENT.buzz_score),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequestBody {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub price_data: Option<Vec<PriceInput>>,
    #[serde(default)]
    pub sentiment_data: Option<Vec<SentimentInput>>,
    #[serde(default)]
    pub prediction_days: Option<i64>,
}

impl PredictRequestBody {
    pub fn into_request(self, default_days: usize) -> Result<PredictionRequest, ForecastError> {
        let ticker = self
            .ticker
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ForecastError::Validation("ticker is required".to_string()))?;
        let prices = self
            .price_data
            .ok_or_else(|| ForecastError::Validation("price_data is required".to_string()))?;

        let sentiment = self
            .sentiment_data
            .unwrap_or_default()
            .into_iter()
            .map(SentimentInput::into_point)
            .collect::<Result<Vec<_>, _>>()?;

        let prediction_days = match self.prediction_days {
            Some(days) => usize::try_from(days).unwrap_or(0),
            None => default_days,
        };

        Ok(PredictionRequest {
            ticker: ticker.trim().to_uppercase(),
            prices: price_points(prices)?,
            sentiment,
            prediction_days,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadlinesBody {
    #[serde(default)]
    pub headlines: Option<Vec<serde_json::Value>>,
}

impl HeadlinesBody {
    /// String entries only; other JSON values are skipped.
    pub fn into_headlines(self) -> Result<Vec<String>, ForecastError> {
        let raw = self
            .headlines
            .ok_or_else(|| ForecastError::Validation("Headlines array required".to_string()))?;
        if raw.is_empty() {
            return Err(ForecastError::Validation(
                "Valid headlines array required".to_string(),
            ));
        }
        Ok(raw
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub text: Option<serde_json::Value>,
}

impl TextBody {
    pub fn into_text(self) -> Result<String, ForecastError> {
        match self.text {
            None => Err(ForecastError::Validation("Text field required".to_string())),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s),
            Some(_) => Err(ForecastError::Validation(
                "Valid text string required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TechnicalBody {
    #[serde(default)]
    pub prices: Option<Vec<PriceInput>>,
}

impl TechnicalBody {
    pub fn into_closes(self, min_points: usize) -> Result<Vec<f64>, ForecastError> {
        let prices = self
            .prices
            .ok_or_else(|| ForecastError::Validation("prices array required".to_string()))?;
        if prices.len() < min_points {
            return Err(ForecastError::Validation(format!(
                "Need at least {} price points",
                min_points
            )));
        }
        let points = price_points(prices)?;
        if points.iter().any(|p| !p.close.is_finite()) {
            return Err(ForecastError::Validation(
                "prices must be finite numbers".to_string(),
            ));
        }
        Ok(points.into_iter().map(|p| p.close).collect())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub success: bool,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            success: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub report: PredictionReport,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HeadlineResponse {
    #[serde(flatten)]
    pub analysis: HeadlineAnalysis,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SingleTextResponse {
    pub text: String,
    pub sentiment_score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct TechnicalResponse {
    pub technical_indicators: TechnicalIndicators,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub sentiment_backend: String,
    pub max_concurrent_trainings: usize,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}
