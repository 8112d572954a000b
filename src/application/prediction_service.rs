//! Forecast orchestration shared by the HTTP router, the Lambda adapter and the CLI.
//!
//! Every call builds its own scalers and network; the only state shared between requests
//! is configuration, metrics and the training semaphore.

use crate::application::analysis::{
    ConfidenceEstimator, analyze_sentiment_price_correlation, analyze_technical_indicators,
};
use crate::application::ml::{
    ForecasterConfig, SentimentForecaster, TrainingReport, prepare_features,
};
use crate::config::{ModelEnvConfig, ServiceEnvConfig};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{ModelMetrics, PredictionReport, round_to};
use crate::domain::market::{PricePoint, SentimentPoint, closes};
use crate::infrastructure::observability::Metrics;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, Span, error, info, info_span, warn};
use uuid::Uuid;

const FEATURES_USED: [&str; 4] = ["price", "sentiment_score", "news_count", "buzz_score"];

#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub ticker: String,
    pub prices: Vec<PricePoint>,
    pub sentiment: Vec<SentimentPoint>,
    pub prediction_days: usize,
}

/// Reject malformed requests before any model work starts.
pub fn validate_request(
    request: &PredictionRequest,
    limits: &ServiceEnvConfig,
) -> Result<(), ForecastError> {
    if request.ticker.trim().is_empty() {
        return Err(ForecastError::Validation("ticker is required".to_string()));
    }

    if request.prices.len() < limits.min_price_points {
        return Err(ForecastError::Validation(format!(
            "Need at least {} price points for enhanced prediction, got {}",
            limits.min_price_points,
            request.prices.len()
        )));
    }

    if !(1..=limits.max_prediction_days).contains(&request.prediction_days) {
        return Err(ForecastError::Validation(format!(
            "prediction_days must be between 1 and {}, got {}",
            limits.max_prediction_days, request.prediction_days
        )));
    }

    if let Some(idx) = request
        .prices
        .iter()
        .position(|p| !p.close.is_finite() || p.close < 0.0)
    {
        return Err(ForecastError::Validation(format!(
            "price_data[{}] must be a finite, non-negative close",
            idx
        )));
    }

    if let Some(idx) = request.sentiment.iter().position(|s| {
        !s.sentiment_score.is_finite() || !s.buzz_score.is_finite() || s.buzz_score < 0.0
    }) {
        return Err(ForecastError::Validation(format!(
            "sentiment_data[{}] contains an invalid score",
            idx
        )));
    }

    Ok(())
}

/// Prepare, train, roll out and assemble one forecast. Blocking.
pub fn run_forecast(
    request: &PredictionRequest,
    config: &ForecasterConfig,
    sequence_length: usize,
) -> Result<(PredictionReport, TrainingReport), ForecastError> {
    let close_series = closes(&request.prices);

    let features = prepare_features(&request.prices, &request.sentiment, sequence_length)?;

    let mut forecaster = SentimentForecaster::new(config.clone());
    let training = forecaster.train(&features)?;

    let (price_window, sentiment_window) = features.latest_window();
    let raw_predictions =
        forecaster.forecast(price_window, sentiment_window, request.prediction_days)?;

    let estimator = ConfidenceEstimator::from_history(&close_series, &request.sentiment);
    let anchor = request
        .prices
        .last()
        .and_then(|p| p.date)
        .unwrap_or_else(|| Utc::now().date_naive());
    let predictions = estimator.forecast_days(&raw_predictions, anchor);

    let technical_indicators = analyze_technical_indicators(&close_series)
        .ok_or_else(|| ForecastError::Validation("price series is empty".to_string()))?;
    let sentiment_analysis =
        analyze_sentiment_price_correlation(&close_series, &request.sentiment);

    let model_metrics = ModelMetrics {
        model_type: "SentimentEnhancedLSTM".to_string(),
        architecture: format!(
            "dual {}-layer LSTM (hidden {}) + {}-head attention + MLP head",
            config.network.encoder_layers,
            config.network.hidden_size / 2,
            config.network.attention_heads
        ),
        training_data_points: request.prices.len(),
        sentiment_data_points: request.sentiment.len(),
        sequence_length,
        prediction_horizon: request.prediction_days,
        features_used: FEATURES_USED.iter().map(|f| f.to_string()).collect(),
        epochs_trained: training.epochs_trained,
        final_loss: round_to(training.final_loss, 6),
        stopped_early: training.stopped_early(),
        training_duration_ms: training.duration.as_millis() as u64,
        training_timestamp: Utc::now(),
    };

    let report = PredictionReport {
        ticker: request.ticker.clone(),
        predictions,
        technical_indicators,
        sentiment_analysis,
        model_metrics,
    };

    Ok((report, training))
}

fn outcome_label(result: &Result<PredictionReport, ForecastError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ForecastError::Busy) => "busy",
        Err(e) if e.is_client_error() => "client_error",
        Err(_) => "error",
    }
}

/// Counts one prediction outcome when dropped, "cancelled" unless a result was recorded.
struct OutcomeRecorder {
    metrics: Metrics,
    outcome: Option<&'static str>,
}

impl OutcomeRecorder {
    fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            outcome: None,
        }
    }

    fn record(&mut self, result: &Result<PredictionReport, ForecastError>) {
        self.outcome = Some(outcome_label(result));
    }
}

impl Drop for OutcomeRecorder {
    fn drop(&mut self) {
        self.metrics
            .inc_predictions(self.outcome.unwrap_or("cancelled"));
    }
}

#[derive(Clone)]
pub struct PredictionService {
    model: ModelEnvConfig,
    limits: ServiceEnvConfig,
    training_permits: Arc<Semaphore>,
    metrics: Metrics,
}

impl PredictionService {
    pub fn new(model: ModelEnvConfig, limits: ServiceEnvConfig, metrics: Metrics) -> Self {
        let training_permits = Arc::new(Semaphore::new(limits.max_concurrent_trainings));
        Self {
            model,
            limits,
            training_permits,
            metrics,
        }
    }

    pub fn limits(&self) -> &ServiceEnvConfig {
        &self.limits
    }

    pub fn validate(&self, request: &PredictionRequest) -> Result<(), ForecastError> {
        validate_request(request, &self.limits)
    }

    pub async fn predict(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionReport, ForecastError> {
        let span = info_span!(
            "predict",
            ticker = %request.ticker,
            request_id = %Uuid::new_v4()
        );

        let mut recorder = OutcomeRecorder::new(self.metrics.clone());
        let result = self.predict_inner(request).instrument(span).await;
        recorder.record(&result);
        result
    }

    async fn predict_inner(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionReport, ForecastError> {
        self.validate(&request)?;

        info!(
            "Enhanced prediction requested: {} prices, {} sentiment points, {} days",
            request.prices.len(),
            request.sentiment.len(),
            request.prediction_days
        );

        let permit = match tokio::time::timeout(
            self.limits.training_queue_timeout(),
            self.training_permits.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(ForecastError::Internal(
                    "training pool is closed".to_string(),
                ));
            }
            Err(_) => {
                warn!(
                    "No training slot within {:?}, rejecting request",
                    self.limits.training_queue_timeout()
                );
                return Err(ForecastError::Busy);
            }
        };

        let config = ForecasterConfig::from(&self.model);
        let sequence_length = self.model.sequence_length;
        let span = Span::current();
        let metrics = self.metrics.clone();
        let in_flight = self.metrics.training_started();

        // permit and gauge guard live as long as the blocking task, not the caller
        let joined = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let _in_flight = in_flight;
            let _permit = permit;
            let outcome = run_forecast(&request, &config, sequence_length);
            if let Ok((_, training)) = &outcome {
                metrics.observe_training(training.duration, training.epochs_trained);
            }
            outcome
        })
        .await;

        let (report, training) = match joined {
            Ok(outcome) => outcome?,
            Err(e) => {
                error!("Training task failed: {}", e);
                return Err(ForecastError::Internal(format!(
                    "training task failed: {}",
                    e
                )));
            }
        };

        info!(
            "Prediction complete: {} days, {} epochs in {:?}, final loss {:.6}",
            report.predictions.len(),
            training.epochs_trained,
            training.duration,
            training.final_loss
        );

        Ok(report)
    }
}
