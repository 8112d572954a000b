//! Per-request forecaster: owns one freshly trained network and its price scaler.

use super::feature_preparation::{MIN_TRAINING_WINDOWS, PreparedFeatures, SENTIMENT_FEATURES};
use super::network::{DualStreamNetwork, NetworkConfig};
use super::scaler::MinMaxScaler;
use super::trainer::{TrainingConfig, TrainingReport, TrainingTensors, train_network};
use crate::config::ModelEnvConfig;
use crate::domain::errors::ForecastError;
use crate::domain::market::NEUTRAL_SENTIMENT;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use ndarray::Array2;
use std::collections::VecDeque;
use tracing::debug;

/// Per-day multiplier applied to the sentiment score during the roll-out.
pub const SENTIMENT_DECAY: f64 = 0.9;

#[derive(Debug, Clone, Default)]
pub struct ForecasterConfig {
    pub network: NetworkConfig,
    pub training: TrainingConfig,
}

impl From<&ModelEnvConfig> for ForecasterConfig {
    fn from(config: &ModelEnvConfig) -> Self {
        Self {
            network: config.network_config(),
            training: TrainingConfig::from(config),
        }
    }
}

struct TrainedModel {
    network: DualStreamNetwork,
    // keeps the trained variables alive alongside the network
    _varmap: VarMap,
    price_scaler: MinMaxScaler,
}

pub struct SentimentForecaster {
    config: ForecasterConfig,
    device: Device,
    model: Option<TrainedModel>,
}

impl SentimentForecaster {
    pub fn new(config: ForecasterConfig) -> Self {
        Self {
            config,
            device: Device::Cpu,
            model: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn train(&mut self, features: &PreparedFeatures) -> Result<TrainingReport, ForecastError> {
        let windows = features.window_count();
        if windows < MIN_TRAINING_WINDOWS {
            return Err(ForecastError::TrainingData {
                windows,
                required: MIN_TRAINING_WINDOWS,
            });
        }

        // a failed retrain must not leave the previous weights usable
        self.model = None;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let network = DualStreamNetwork::new(&self.config.network, vb)?;
        let tensors = TrainingTensors::from_features(features, &self.device)?;

        let report = train_network(&network, &varmap, &tensors, &self.config.training)?;

        self.model = Some(TrainedModel {
            network,
            _varmap: varmap,
            price_scaler: features.price_scaler.clone(),
        });

        Ok(report)
    }

    /// Single scaled next-step prediction for one window.
    pub fn predict_scaled(
        &self,
        price_window: &[f64],
        sentiment_window: &[[f64; SENTIMENT_FEATURES]],
    ) -> Result<f64, ForecastError> {
        let model = self.model.as_ref().ok_or(ForecastError::ModelNotTrained)?;
        Self::run(&model.network, &self.device, price_window, sentiment_window)
    }

    fn run(
        network: &DualStreamNetwork,
        device: &Device,
        price_window: &[f64],
        sentiment_window: &[[f64; SENTIMENT_FEATURES]],
    ) -> Result<f64, ForecastError> {
        let seq = price_window.len();
        if seq == 0 || sentiment_window.len() != seq {
            return Err(ForecastError::Internal(format!(
                "window shape mismatch: {} prices, {} sentiment rows",
                seq,
                sentiment_window.len()
            )));
        }

        let prices: Vec<f32> = price_window.iter().map(|&v| v as f32).collect();
        let sentiment: Vec<f32> = sentiment_window
            .iter()
            .flat_map(|row| row.iter().map(|&v| v as f32))
            .collect();

        let prices = Tensor::from_vec(prices, (1, seq, 1), device)?;
        let sentiment = Tensor::from_vec(sentiment, (1, seq, SENTIMENT_FEATURES), device)?;

        let output: Vec<f32> = network.forward(&prices, &sentiment, false)?.to_vec1()?;
        output
            .first()
            .map(|&v| f64::from(v))
            .ok_or_else(|| ForecastError::Numeric("model produced no output".to_string()))
    }

    /// Roll the model forward `days_ahead` steps from the given scaled windows.
    ///
    /// Each step feeds the prediction back into the price window, decays the sentiment
    /// score of the newest sentiment row by `0.9^(day+1)` and opens the next slot with a
    /// neutral `{0, 1, 1}` row. Returns predictions in price units.
    pub fn forecast(
        &self,
        price_window: Vec<f64>,
        sentiment_window: Array2<f64>,
        days_ahead: usize,
    ) -> Result<Vec<f64>, ForecastError> {
        let model = self.model.as_ref().ok_or(ForecastError::ModelNotTrained)?;

        let mut prices: VecDeque<f64> = price_window.into();
        let mut sentiment: VecDeque<[f64; SENTIMENT_FEATURES]> = sentiment_window
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();

        let mut scaled_predictions = Vec::with_capacity(days_ahead);

        for day in 0..days_ahead {
            let next = Self::run(
                &model.network,
                &self.device,
                prices.make_contiguous(),
                sentiment.make_contiguous(),
            )?;
            scaled_predictions.push(next);
            advance_window(&mut prices, &mut sentiment, next, day);
        }

        debug!("Rolled forecast forward {} days", days_ahead);

        Ok(model.price_scaler.inverse_series(&scaled_predictions))
    }
}

/// Slide both windows one step after predicting `next` on roll-out day `day`.
///
/// The newest sentiment row has its score decayed by `0.9^(day+1)` before the oldest
/// row is dropped and a neutral row is appended.
pub fn advance_window(
    prices: &mut VecDeque<f64>,
    sentiment: &mut VecDeque<[f64; SENTIMENT_FEATURES]>,
    next: f64,
    day: usize,
) {
    prices.pop_front();
    prices.push_back(next);

    if let Some(last) = sentiment.back_mut() {
        last[0] *= SENTIMENT_DECAY.powi(day as i32 + 1);
    }
    sentiment.pop_front();
    sentiment.push_back(NEUTRAL_SENTIMENT.features());
}
