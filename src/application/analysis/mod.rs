// Forecast confidence calibration
pub mod confidence;

// Sentiment vs. price movement
pub mod correlation;

// Batch headline sentiment
pub mod headlines;

// SMA, RSI, Bollinger
pub mod indicators;

pub use confidence::ConfidenceEstimator;
pub use correlation::analyze_sentiment_price_correlation;
pub use headlines::{HeadlineAnalysis, analyze_headlines, score_text};
pub use indicators::analyze_technical_indicators;
