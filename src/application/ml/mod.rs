pub mod feature_preparation;
pub mod forecaster;
pub mod network;
pub mod scaler;
pub mod trainer;

pub use feature_preparation::{PreparedFeatures, prepare_features};
pub use forecaster::{ForecasterConfig, SentimentForecaster, advance_window};
pub use trainer::{StopReason, TrainingConfig, TrainingReport};
