use thiserror::Error;

/// Errors raised while validating, training or rolling out a forecast.
///
/// Every variant is scoped to a single request: nothing here carries state that
/// could leak into the next one.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Insufficient data: {windows} training windows available, need at least {required}")]
    InsufficientData { windows: usize, required: usize },

    #[error("Insufficient data for training: {windows} samples, need at least {required}")]
    TrainingData { windows: usize, required: usize },

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Numeric failure: {0}")]
    Numeric(String),

    #[error("Training capacity exhausted, retry later")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForecastError {
    /// True for failures caused by the caller's input rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InsufficientData { .. } | Self::TrainingData { .. }
        )
    }
}

impl From<candle_core::Error> for ForecastError {
    fn from(err: candle_core::Error) -> Self {
        Self::Numeric(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_formatting() {
        let err = ForecastError::InsufficientData {
            windows: 4,
            required: 10,
        };

        let msg = err.to_string();
        assert!(msg.contains('4'));
        assert!(msg.contains("10"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_engine_errors_are_not_client_errors() {
        assert!(!ForecastError::ModelNotTrained.is_client_error());
        assert!(!ForecastError::Busy.is_client_error());
        assert!(!ForecastError::Numeric("nan".to_string()).is_client_error());
    }
}
