use super::feature_preparation::{MIN_TRAINING_WINDOWS, PreparedFeatures, SENTIMENT_FEATURES};
use super::network::DualStreamNetwork;
use crate::config::ModelEnvConfig;
use crate::domain::errors::ForecastError;
use candle_core::backprop::GradStore;
use candle_core::{Device, Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PROGRESS_LOG_EVERY: usize = 20;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub max_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub early_stopping_patience: usize,
    pub lr_plateau_patience: usize,
    pub lr_plateau_factor: f64,
    pub grad_clip_norm: f64,
    pub max_duration: Duration,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_epochs: 80,
            batch_size: 16,
            learning_rate: 1e-3,
            weight_decay: 0.01,
            early_stopping_patience: 20,
            lr_plateau_patience: 10,
            lr_plateau_factor: 0.1,
            grad_clip_norm: 1.0,
            max_duration: Duration::from_secs(120),
            seed: None,
        }
    }
}

impl From<&ModelEnvConfig> for TrainingConfig {
    fn from(config: &ModelEnvConfig) -> Self {
        Self {
            max_epochs: config.max_epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            weight_decay: config.weight_decay,
            early_stopping_patience: config.early_stopping_patience,
            lr_plateau_patience: config.lr_plateau_patience,
            grad_clip_norm: config.grad_clip_norm,
            max_duration: Duration::from_secs(config.max_training_secs),
            seed: config.training_seed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxEpochs,
    EarlyStopping,
    TimeBudget,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs_trained: usize,
    pub final_loss: f64,
    pub best_loss: f64,
    pub final_learning_rate: f64,
    pub stop_reason: StopReason,
    pub duration: Duration,
}

impl TrainingReport {
    pub fn stopped_early(&self) -> bool {
        self.stop_reason != StopReason::MaxEpochs
    }
}

/// Reduce-on-plateau learning rate schedule (mode "min", relative threshold).
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    patience: usize,
    factor: f64,
    threshold: f64,
    min_lr: f64,
    best: f64,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(patience: usize, factor: f64) -> Self {
        Self {
            patience,
            factor,
            threshold: 1e-4,
            min_lr: 0.0,
            best: f64::INFINITY,
            bad_epochs: 0,
        }
    }

    /// Feed one epoch's loss; returns the new learning rate when it should drop.
    pub fn step(&mut self, loss: f64, current_lr: f64) -> Option<f64> {
        if loss < self.best * (1.0 - self.threshold) {
            self.best = loss;
            self.bad_epochs = 0;
            return None;
        }

        self.bad_epochs += 1;
        if self.bad_epochs > self.patience {
            self.bad_epochs = 0;
            let new_lr = (current_lr * self.factor).max(self.min_lr);
            if current_lr - new_lr > 1e-12 {
                return Some(new_lr);
            }
        }
        None
    }
}

/// Stops training once the loss has not improved for `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    counter: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            counter: 0,
        }
    }

    /// Returns true when training should halt.
    pub fn update(&mut self, loss: f64) -> bool {
        if loss < self.best {
            self.best = loss;
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        self.counter >= self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Supervised windows as f32 tensors.
pub struct TrainingTensors {
    /// (n, seq, 1)
    pub prices: Tensor,
    /// (n, seq, 3)
    pub sentiment: Tensor,
    /// (n,)
    pub targets: Tensor,
}

impl TrainingTensors {
    pub fn from_features(features: &PreparedFeatures, device: &Device) -> candle_core::Result<Self> {
        let n = features.window_count();
        let seq = features.sequence_length;

        let prices: Vec<f32> = features.price_windows.iter().map(|&v| v as f32).collect();
        let sentiment: Vec<f32> = features
            .sentiment_windows
            .iter()
            .map(|&v| v as f32)
            .collect();
        let targets: Vec<f32> = features.targets.iter().map(|&v| v as f32).collect();

        Ok(Self {
            prices: Tensor::from_vec(prices, (n, seq, 1), device)?,
            sentiment: Tensor::from_vec(sentiment, (n, seq, SENTIMENT_FEATURES), device)?,
            targets: Tensor::from_vec(targets, n, device)?,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scale gradients in place so their global L2 norm does not exceed `max_norm`.
///
/// Returns the norm measured before clipping.
pub fn clip_grad_norm(
    vars: &[Var],
    grads: &mut GradStore,
    max_norm: f64,
) -> candle_core::Result<f64> {
    let mut sum_sq = 0.0f64;
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            sum_sq += f64::from(grad.sqr()?.sum_all()?.to_scalar::<f32>()?);
        }
    }

    let norm = sum_sq.sqrt();
    if norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        for var in vars {
            if let Some(grad) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), (grad * scale)?);
            }
        }
    }
    Ok(norm)
}

/// Fit `network` on `data`, mutating the variables held by `varmap`.
pub fn train_network(
    network: &DualStreamNetwork,
    varmap: &VarMap,
    data: &TrainingTensors,
    config: &TrainingConfig,
) -> Result<TrainingReport, ForecastError> {
    let samples = data.len();
    if samples < MIN_TRAINING_WINDOWS {
        return Err(ForecastError::TrainingData {
            windows: samples,
            required: MIN_TRAINING_WINDOWS,
        });
    }
    if config.batch_size == 0 || config.max_epochs == 0 {
        return Err(ForecastError::Validation(
            "batch size and epoch count must be positive".to_string(),
        ));
    }

    let vars = varmap.all_vars();
    let mut optimizer = AdamW::new(
        vars.clone(),
        ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut scheduler = PlateauScheduler::new(config.lr_plateau_patience, config.lr_plateau_factor);
    let mut early_stopping = EarlyStopping::new(config.early_stopping_patience);
    let mut indices: Vec<u32> = (0..samples as u32).collect();
    let device = data.targets.device().clone();

    let started = Instant::now();
    let mut epochs_trained = 0;
    let mut final_loss = f64::NAN;
    let mut stop_reason = StopReason::MaxEpochs;

    info!(
        "Training on {} windows (max {} epochs, batch {})",
        samples, config.max_epochs, config.batch_size
    );

    for epoch in 0..config.max_epochs {
        if started.elapsed() >= config.max_duration {
            warn!(
                "Training budget of {:?} exhausted after {} epochs",
                config.max_duration, epochs_trained
            );
            stop_reason = StopReason::TimeBudget;
            break;
        }

        indices.shuffle(&mut rng);

        let mut total_loss = 0.0;
        let mut batches = 0usize;
        for chunk in indices.chunks(config.batch_size) {
            let ids = Tensor::from_slice(chunk, chunk.len(), &device)?;
            let prices = data.prices.index_select(&ids, 0)?;
            let sentiment = data.sentiment.index_select(&ids, 0)?;
            let targets = data.targets.index_select(&ids, 0)?;

            let predictions = network.forward(&prices, &sentiment, true)?;
            let loss = candle_nn::loss::mse(&predictions, &targets)?;

            let mut grads = loss.backward()?;
            clip_grad_norm(&vars, &mut grads, config.grad_clip_norm)?;
            optimizer.step(&grads)?;

            total_loss += f64::from(loss.to_scalar::<f32>()?);
            batches += 1;
        }

        let epoch_loss = total_loss / batches as f64;
        if !epoch_loss.is_finite() {
            return Err(ForecastError::Numeric(format!(
                "training diverged at epoch {} (loss {})",
                epoch + 1,
                epoch_loss
            )));
        }

        epochs_trained = epoch + 1;
        final_loss = epoch_loss;

        if let Some(new_lr) = scheduler.step(epoch_loss, optimizer.learning_rate()) {
            debug!("Reducing learning rate to {:.2e}", new_lr);
            optimizer.set_learning_rate(new_lr);
        }

        if epoch % PROGRESS_LOG_EVERY == 0 {
            info!(
                "Epoch {}/{}, Loss: {:.6}, LR: {:.2e}",
                epoch + 1,
                config.max_epochs,
                epoch_loss,
                optimizer.learning_rate()
            );
        }

        if early_stopping.update(epoch_loss) {
            info!("Early stopping at epoch {}", epoch + 1);
            stop_reason = StopReason::EarlyStopping;
            break;
        }
    }

    Ok(TrainingReport {
        epochs_trained,
        final_loss,
        best_loss: early_stopping.best(),
        final_learning_rate: optimizer.learning_rate(),
        stop_reason,
        duration: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::feature_preparation::prepare_features;
    use crate::application::ml::network::NetworkConfig;
    use crate::domain::market::PricePoint;
    use candle_core::DType;
    use candle_nn::VarBuilder;

    #[test]
    fn test_plateau_scheduler_reduces_after_patience() {
        let mut scheduler = PlateauScheduler::new(2, 0.1);
        assert_eq!(scheduler.step(1.0, 1e-3), None);
        assert_eq!(scheduler.step(1.0, 1e-3), None);
        assert_eq!(scheduler.step(1.0, 1e-3), None);
        let reduced = scheduler.step(1.0, 1e-3).unwrap();
        assert!((reduced - 1e-4).abs() < 1e-12);
        // an improvement resets the counter
        assert_eq!(scheduler.step(0.5, reduced), None);
    }

    #[test]
    fn test_plateau_ignores_negligible_improvement() {
        let mut scheduler = PlateauScheduler::new(0, 0.5);
        assert_eq!(scheduler.step(1.0, 1.0), None);
        // 1e-6 relative improvement is below the threshold
        assert_eq!(scheduler.step(0.999_999, 1.0), Some(0.5));
    }

    #[test]
    fn test_early_stopping_counts_consecutive_misses() {
        let mut stopper = EarlyStopping::new(3);
        assert!(!stopper.update(1.0));
        assert!(!stopper.update(1.1));
        assert!(!stopper.update(0.9));
        assert!(!stopper.update(0.95));
        assert!(!stopper.update(0.95));
        assert!(stopper.update(0.95));
        assert_eq!(stopper.best(), 0.9);
    }

    #[test]
    fn test_clip_grad_norm_bounds_gradients() {
        let device = Device::Cpu;
        let var = Var::new(&[3.0f32, 4.0], &device).unwrap();
        let loss = (var.as_tensor().sqr().unwrap().sum_all().unwrap() * 0.5).unwrap();
        let mut grads = loss.backward().unwrap();

        // gradient of 0.5*|x|^2 is x, norm 5
        let norm = clip_grad_norm(&[var.clone()], &mut grads, 1.0).unwrap();
        assert!((norm - 5.0).abs() < 1e-4);

        let clipped: Vec<f32> = grads.get(var.as_tensor()).unwrap().to_vec1().unwrap();
        let clipped_norm = clipped.iter().map(|g| g * g).sum::<f32>().sqrt();
        assert!(clipped_norm <= 1.0 + 1e-4);
    }

    #[test]
    fn test_training_runs_and_reports() {
        let prices: Vec<PricePoint> = (0..45)
            .map(|i| PricePoint::new(50.0 + (i as f64 * 0.3).sin() * 5.0))
            .collect();
        let features = prepare_features(&prices, &[], 30).unwrap();

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let network = DualStreamNetwork::new(&NetworkConfig::default(), vb).unwrap();
        let tensors = TrainingTensors::from_features(&features, &device).unwrap();
        assert_eq!(tensors.len(), 15);

        let config = TrainingConfig {
            max_epochs: 3,
            seed: Some(7),
            ..TrainingConfig::default()
        };
        let report = train_network(&network, &varmap, &tensors, &config).unwrap();

        assert_eq!(report.epochs_trained, 3);
        assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        assert!(!report.stopped_early());
        assert!(report.final_loss.is_finite());
    }

    #[test]
    fn test_zero_time_budget_stops_immediately() {
        let prices: Vec<PricePoint> = (0..42).map(|i| PricePoint::new(10.0 + i as f64)).collect();
        let features = prepare_features(&prices, &[], 30).unwrap();

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let network = DualStreamNetwork::new(&NetworkConfig::default(), vb).unwrap();
        let tensors = TrainingTensors::from_features(&features, &device).unwrap();

        let config = TrainingConfig {
            max_duration: Duration::ZERO,
            ..TrainingConfig::default()
        };
        let report = train_network(&network, &varmap, &tensors, &config).unwrap();

        assert_eq!(report.epochs_trained, 0);
        assert_eq!(report.stop_reason, StopReason::TimeBudget);
        assert!(report.stopped_early());
    }
}
