use chrono::NaiveDate;
use marketsense::application::ml::ForecasterConfig;
use marketsense::application::prediction_service::{
    PredictionRequest, PredictionService, run_forecast, validate_request,
};
use marketsense::config::{ModelEnvConfig, ServiceEnvConfig};
use marketsense::domain::errors::ForecastError;
use marketsense::domain::forecast::ImpactStrength;
use marketsense::domain::market::{PricePoint, SentimentPoint};
use marketsense::infrastructure::observability::Metrics;

fn quick_model() -> ModelEnvConfig {
    ModelEnvConfig {
        max_epochs: 3,
        hidden_size: 16,
        attention_heads: 4,
        training_seed: Some(42),
        ..ModelEnvConfig::default()
    }
}

fn constant_request(days: usize) -> PredictionRequest {
    PredictionRequest {
        ticker: "FLAT".to_string(),
        prices: vec![PricePoint::new(100.0); 45],
        sentiment: Vec::new(),
        prediction_days: days,
    }
}

#[test]
fn test_constant_series_report() {
    let model = quick_model();
    let request = constant_request(3);
    validate_request(&request, &ServiceEnvConfig::default()).unwrap();

    let (report, training) = run_forecast(
        &request,
        &ForecasterConfig::from(&model),
        model.sequence_length,
    )
    .unwrap();

    let indicators = &report.technical_indicators;
    assert_eq!(indicators.sma_20, 100.0);
    assert_eq!(indicators.sma_50, 100.0);
    assert_eq!(indicators.rsi, 50.0);
    assert_eq!(indicators.bollinger_upper, 102.0);
    assert_eq!(indicators.bollinger_lower, 98.0);
    assert_eq!(indicators.current_price, 100.0);

    assert_eq!(report.predictions.len(), 3);
    assert_eq!(report.predictions[0].confidence, 57.0);
    assert_eq!(report.predictions[0].sentiment_factor, 0.0);
    for day in &report.predictions {
        assert!(day.upper_bound >= day.predicted_price);
        assert!(day.predicted_price >= day.lower_bound);
        assert!(day.predicted_price >= 0.0);
        assert!((35.0..=92.0).contains(&day.confidence));
    }
    assert!(
        report
            .predictions
            .windows(2)
            .all(|w| w[1].confidence <= w[0].confidence)
    );

    assert_eq!(report.sentiment_analysis.data_points, 0);
    assert_eq!(report.sentiment_analysis.impact_strength, ImpactStrength::Low);

    let metrics = &report.model_metrics;
    assert_eq!(metrics.model_type, "SentimentEnhancedLSTM");
    assert_eq!(metrics.training_data_points, 45);
    assert_eq!(metrics.sequence_length, 30);
    assert_eq!(metrics.prediction_horizon, 3);
    assert_eq!(metrics.features_used.len(), 4);
    assert_eq!(metrics.epochs_trained, training.epochs_trained);
    assert!(training.epochs_trained <= 3);
}

#[test]
fn test_dates_follow_last_price() {
    let model = quick_model();
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let prices = (0..45)
        .map(|i| {
            PricePoint::dated(
                start + chrono::Days::new(i),
                100.0 + (i as f64 * 0.7).sin() * 3.0,
            )
        })
        .collect();
    let request = PredictionRequest {
        ticker: "WAVE".to_string(),
        prices,
        sentiment: Vec::new(),
        prediction_days: 2,
    };

    let (report, _) = run_forecast(
        &request,
        &ForecasterConfig::from(&model),
        model.sequence_length,
    )
    .unwrap();

    assert_eq!(
        report.predictions[0].date,
        NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()
    );
    assert_eq!(
        report.predictions[1].date,
        NaiveDate::from_ymd_opt(2025, 2, 16).unwrap()
    );
}

#[test]
fn test_sentiment_raises_confidence_and_is_correlated() {
    let model = quick_model();
    let prices: Vec<PricePoint> = (0..50).map(|i| PricePoint::new(100.0 + i as f64)).collect();
    let sentiment = vec![SentimentPoint::new(0.8, 8, 2.0); 20];
    let request = PredictionRequest {
        ticker: "BULL".to_string(),
        prices,
        sentiment,
        prediction_days: 5,
    };

    let (report, _) = run_forecast(
        &request,
        &ForecasterConfig::from(&model),
        model.sequence_length,
    )
    .unwrap();

    // |0.8| * 0.3 = 0.24, capped at 0.2
    assert_eq!(report.predictions[0].sentiment_factor, 20.0);
    assert_eq!(report.sentiment_analysis.data_points, 20);
    assert_eq!(report.model_metrics.sentiment_data_points, 20);
    assert!(report.predictions.iter().all(|d| d.confidence <= 92.0));
}

#[test]
fn test_short_history_rejected() {
    let mut request = constant_request(3);
    request.prices.truncate(39);

    let err = validate_request(&request, &ServiceEnvConfig::default()).unwrap_err();
    assert!(err.is_client_error());
    assert!(
        err.to_string()
            .ends_with("Need at least 40 price points for enhanced prediction, got 39")
    );
}

#[tokio::test]
async fn test_service_records_outcomes() {
    let metrics = Metrics::new().unwrap();
    let service = PredictionService::new(quick_model(), ServiceEnvConfig::default(), metrics.clone());

    let report = service.predict(constant_request(2)).await.unwrap();
    assert_eq!(report.ticker, "FLAT");

    let mut short = constant_request(2);
    short.prices.truncate(10);
    let err = service.predict(short).await.unwrap_err();
    assert!(matches!(err, ForecastError::Validation(_)));

    let rendered = metrics.render();
    assert!(rendered.contains("marketsense_predictions_total{outcome=\"success\"} 1"));
    assert!(rendered.contains("marketsense_predictions_total{outcome=\"client_error\"} 1"));
    assert!(rendered.contains("marketsense_training_duration_seconds_count 1"));
}
