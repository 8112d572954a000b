//! Prometheus metrics definitions for MarketSense
//!
//! All metrics use the `marketsense_` prefix and are exposed read-only at `/metrics`.

use prometheus::{
    Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus metrics for the forecasting service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Prediction requests by outcome (success, client_error, busy, error, cancelled)
    pub predictions_total: IntCounterVec,
    /// Wall-clock time spent training one model
    pub training_duration_seconds: Histogram,
    /// Epochs actually run per training
    pub training_epochs: Histogram,
    /// Trainings currently holding a permit
    pub trainings_in_flight: IntGauge,
    /// Sentiment requests by endpoint
    pub sentiment_requests_total: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with all collectors registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = IntCounterVec::new(
            Opts::new(
                "marketsense_predictions_total",
                "Prediction requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let training_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "marketsense_training_duration_seconds",
                "Model training wall-clock time in seconds",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(training_duration_seconds.clone()))?;

        let training_epochs = Histogram::with_opts(
            HistogramOpts::new("marketsense_training_epochs", "Epochs run per training")
                .buckets(vec![5.0, 10.0, 20.0, 30.0, 40.0, 60.0, 80.0, 100.0]),
        )?;
        registry.register(Box::new(training_epochs.clone()))?;

        let trainings_in_flight = IntGauge::with_opts(Opts::new(
            "marketsense_trainings_in_flight",
            "Trainings currently running",
        ))?;
        registry.register(Box::new(trainings_in_flight.clone()))?;

        let sentiment_requests_total = IntCounterVec::new(
            Opts::new(
                "marketsense_sentiment_requests_total",
                "Sentiment requests by endpoint",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(sentiment_requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            training_duration_seconds,
            training_epochs,
            trainings_in_flight,
            sentiment_requests_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    /// Count one training as running until the returned guard is dropped.
    pub fn training_started(&self) -> InFlightGuard {
        self.trainings_in_flight.inc();
        InFlightGuard(self.trainings_in_flight.clone())
    }

    pub fn observe_training(&self, duration: Duration, epochs: usize) {
        self.training_duration_seconds
            .observe(duration.as_secs_f64());
        self.training_epochs.observe(epochs as f64);
    }

    pub fn inc_sentiment_requests(&self, endpoint: &str) {
        self.sentiment_requests_total
            .with_label_values(&[endpoint])
            .inc();
    }
}

/// Decrements `marketsense_trainings_in_flight` on drop.
pub struct InFlightGuard(IntGauge);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}
