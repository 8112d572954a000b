//! Endpoint logic shared by the axum router and the Lambda adapter.
//!
//! Each endpoint takes the raw request body and returns either a JSON value for a
//! 200 response or an [`ApiError`] carrying the status code and client-facing message.

use super::dto::{
    ErrorBody, HeadlineResponse, HeadlinesBody, HealthResponse, PredictRequestBody,
    PredictionResponse, SingleTextResponse, TechnicalBody, TechnicalResponse, TextBody,
};
use crate::application::analysis::{analyze_headlines, analyze_technical_indicators, score_text};
use crate::application::prediction_service::PredictionService;
use crate::config::{Config, SentimentBackend};
use crate::domain::errors::ForecastError;
use crate::domain::sentiment::SentimentAnalyzer;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::sentiment::build_analyzer;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, warn};

/// Minimum series length accepted by the standalone indicator endpoint
pub const MIN_INDICATOR_POINTS: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub predictions: PredictionService,
    pub analyzer: Arc<dyn SentimentAnalyzer>,
    pub metrics: Metrics,
    pub backend: SentimentBackend,
}

impl AppState {
    pub fn new(config: &Config, metrics: Metrics, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        Self {
            predictions: PredictionService::new(
                config.model.clone(),
                config.service.clone(),
                metrics.clone(),
            ),
            analyzer,
            metrics,
            backend: config.service.sentiment_backend,
        }
    }

    /// Metrics registry and analyzer built from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let metrics = Metrics::new()?;
        let analyzer = build_analyzer(config.service.sentiment_backend);
        Ok(Self::new(config, metrics, analyzer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.message.clone())
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        if err.is_client_error() {
            warn!("Rejected request: {}", err);
        }
        match err {
            ForecastError::Validation(message) => Self::bad_request(message),
            ForecastError::InsufficientData { .. } | ForecastError::TrainingData { .. } => {
                Self::bad_request(err.to_string())
            }
            ForecastError::Busy => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: err.to_string(),
            },
            other => {
                error!("Request failed: {}", other);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}

pub type ApiResult = Result<serde_json::Value, ApiError>;

fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value).map_err(|e| {
        ApiError::from(ForecastError::Internal(format!(
            "response serialization failed: {}",
            e
        )))
    })
}

pub fn health(state: &AppState) -> ApiResult {
    to_json(&HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sentiment_backend: state.analyzer.name().to_string(),
        max_concurrent_trainings: state.predictions.limits().max_concurrent_trainings,
        timestamp: Utc::now(),
        success: true,
    })
}

pub async fn predict(state: &AppState, body: &[u8]) -> ApiResult {
    let parsed: PredictRequestBody = parse_body(body)?;
    let request = parsed.into_request(state.predictions.limits().default_prediction_days)?;
    let report = state.predictions.predict(request).await?;
    to_json(&PredictionResponse {
        report,
        success: true,
    })
}

/// Run analyzer work on the blocking pool.
async fn off_reactor<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        ApiError::from(ForecastError::Internal(format!(
            "sentiment task failed: {}",
            e
        )))
    })
}

pub async fn analyze_sentiment(state: &AppState, body: &[u8]) -> ApiResult {
    state.metrics.inc_sentiment_requests("analyze-sentiment");
    let parsed: HeadlinesBody = parse_body(body)?;
    let headlines = parsed.into_headlines()?;
    let analyzer = state.analyzer.clone();
    let max_headlines = state.predictions.limits().max_headlines;
    let analysis =
        off_reactor(move || analyze_headlines(analyzer.as_ref(), &headlines, max_headlines))
            .await?;
    to_json(&HeadlineResponse {
        analysis,
        success: true,
    })
}

pub async fn analyze_single(state: &AppState, body: &[u8]) -> ApiResult {
    state.metrics.inc_sentiment_requests("analyze-single");
    let parsed: TextBody = parse_body(body)?;
    let text = parsed.into_text()?;
    let analyzer = state.analyzer.clone();
    let (text, sentiment) = off_reactor(move || {
        let sentiment = score_text(analyzer.as_ref(), &text);
        (text, sentiment)
    })
    .await?;
    to_json(&SingleTextResponse {
        text,
        sentiment_score: sentiment.score,
        label: sentiment.label,
        confidence: sentiment.confidence,
        timestamp: Utc::now(),
        success: true,
    })
}

pub fn technical_indicators(_state: &AppState, body: &[u8]) -> ApiResult {
    let parsed: TechnicalBody = parse_body(body)?;
    let closes = parsed.into_closes(MIN_INDICATOR_POINTS)?;
    let technical_indicators = analyze_technical_indicators(&closes)
        .ok_or_else(|| ApiError::bad_request("prices array required"))?;
    to_json(&TechnicalResponse {
        technical_indicators,
        timestamp: Utc::now(),
        success: true,
    })
}
