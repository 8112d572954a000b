//! Per-day forecast confidence and price bounds.
//!
//! Blends three signals into a base score:
//!
//! ```text
//! base = clamp(100 * (0.4*price_data_quality + 0.3*volatility_factor + 0.3*sentiment_quality), 35, 92)
//! confidence_i = clamp(base * 0.95^i + sentiment_boost, 35, 92)
//! ```

use crate::domain::forecast::{ForecastDay, round_to};
use crate::domain::market::SentimentPoint;
use chrono::{Days, NaiveDate};
use statrs::statistics::Statistics;

pub const MIN_CONFIDENCE: f64 = 35.0;
pub const MAX_CONFIDENCE: f64 = 92.0;
const DAILY_DECAY: f64 = 0.95;
const VOLATILITY_WINDOW: usize = 30;
const RECENT_SENTIMENT: usize = 7;
/// Sentiment quality used when no sentiment was supplied
const DEFAULT_SENTIMENT_QUALITY: f64 = 0.3;

fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Population standard deviation of the last 30 (or fewer) prices.
pub fn price_volatility(prices: &[f64]) -> f64 {
    let window = tail(prices, VOLATILITY_WINDOW);
    if window.is_empty() {
        return 0.0;
    }
    window.iter().population_std_dev()
}

pub fn price_data_quality(prices: &[f64]) -> f64 {
    (prices.len() as f64 / 100.0).min(1.0)
}

pub fn volatility_factor(prices: &[f64]) -> f64 {
    let window = tail(prices, VOLATILITY_WINDOW);
    if window.is_empty() {
        return 0.2;
    }
    let avg_price = window.iter().mean();
    if avg_price <= 0.0 || !avg_price.is_finite() {
        return 0.2;
    }
    (1.0 - price_volatility(prices) / avg_price * 3.0).max(0.2)
}

/// Coverage and volume of the supplied sentiment. `sentiment` is the caller's series,
/// never the padded one.
pub fn sentiment_quality(sentiment: &[SentimentPoint], price_count: usize) -> f64 {
    if sentiment.is_empty() || price_count == 0 {
        return DEFAULT_SENTIMENT_QUALITY;
    }

    let coverage = (sentiment.len() as f64 / price_count as f64).min(1.0);
    let avg_news = tail(sentiment, RECENT_SENTIMENT)
        .iter()
        .map(|s| f64::from(s.news_count))
        .mean();

    0.7 * coverage + 0.3 * (avg_news / 10.0).min(1.0)
}

/// Flat boost in percentage points from the strength of recent sentiment.
pub fn sentiment_confidence_boost(sentiment: &[SentimentPoint]) -> f64 {
    if sentiment.is_empty() {
        return 0.0;
    }
    let mean_score = tail(sentiment, RECENT_SENTIMENT)
        .iter()
        .map(|s| s.sentiment_score)
        .mean();

    (mean_score.abs() * 0.3).min(0.2) * 100.0
}

/// Multiplier applied around the predicted price: 1 at 100% confidence, 3 at 0%.
pub fn bounds_factor(confidence: f64) -> f64 {
    (1.0 - confidence.min(90.0) / 100.0) * 2.0 + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimator {
    base: f64,
    boost: f64,
}

impl ConfidenceEstimator {
    pub fn new(base: f64, boost: f64) -> Self {
        Self {
            base: base.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
            boost,
        }
    }

    pub fn from_history(prices: &[f64], sentiment: &[SentimentPoint]) -> Self {
        let raw = 100.0
            * (0.4 * price_data_quality(prices)
                + 0.3 * volatility_factor(prices)
                + 0.3 * sentiment_quality(sentiment, prices.len()));

        Self::new(raw, sentiment_confidence_boost(sentiment))
    }

    pub fn base_confidence(&self) -> f64 {
        self.base
    }

    pub fn sentiment_boost(&self) -> f64 {
        self.boost
    }

    /// Decayed confidence for forecast day `day` (0-based).
    pub fn confidence_for_day(&self, day: usize) -> f64 {
        (self.base * DAILY_DECAY.powi(day as i32) + self.boost).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Assemble forecast days from raw predictions, one calendar day apart after `anchor`.
    pub fn forecast_days(&self, predictions: &[f64], anchor: NaiveDate) -> Vec<ForecastDay> {
        predictions
            .iter()
            .enumerate()
            .map(|(i, &raw)| {
                let predicted = raw.max(0.0);
                let confidence = self.confidence_for_day(i);
                let factor = bounds_factor(confidence);

                ForecastDay {
                    date: anchor
                        .checked_add_days(Days::new(i as u64 + 1))
                        .unwrap_or(anchor),
                    predicted_price: round_to(predicted, 2),
                    upper_bound: round_to(predicted * factor, 2),
                    lower_bound: round_to(predicted / factor, 2),
                    confidence: round_to(confidence, 1),
                    sentiment_factor: round_to(self.boost, 1),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_series_without_sentiment() {
        let prices = vec![100.0; 45];
        let estimator = ConfidenceEstimator::from_history(&prices, &[]);

        // 0.4*0.45 + 0.3*1.0 + 0.3*0.3 = 0.57
        assert!((estimator.base_confidence() - 57.0).abs() < 1e-9);
        assert_eq!(estimator.sentiment_boost(), 0.0);
        assert_eq!(sentiment_quality(&[], 45), 0.3);
    }

    #[test]
    fn test_confidence_monotonic_without_boost() {
        let prices: Vec<f64> = (0..120).map(|i| 50.0 + (i % 7) as f64).collect();
        let estimator = ConfidenceEstimator::from_history(&prices, &[]);

        let days: Vec<f64> = (0..30).map(|i| estimator.confidence_for_day(i)).collect();
        assert!(days.windows(2).all(|w| w[1] <= w[0]));
        assert!(days.iter().all(|c| (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(c)));
        assert_eq!(*days.last().unwrap(), MIN_CONFIDENCE);
    }

    #[test]
    fn test_base_confidence_clamped() {
        assert_eq!(ConfidenceEstimator::new(10.0, 0.0).base_confidence(), 35.0);
        assert_eq!(ConfidenceEstimator::new(99.0, 0.0).base_confidence(), 92.0);
    }

    #[test]
    fn test_sentiment_boost_capped() {
        let strong = vec![SentimentPoint::new(0.95, 12, 3.0); 10];
        assert!((sentiment_confidence_boost(&strong) - 20.0).abs() < 1e-9);

        let mild = vec![SentimentPoint::new(-0.2, 2, 1.0); 3];
        assert!((sentiment_confidence_boost(&mild) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_quality_uses_supplied_length() {
        let sentiment = vec![SentimentPoint::new(0.1, 5, 1.0); 20];
        // 0.7 * 20/50 + 0.3 * 5/10
        assert!((sentiment_quality(&sentiment, 50) - 0.43).abs() < 1e-9);
    }

    #[test]
    fn test_volatile_series_floors_factor() {
        let prices: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 100.0 }).collect();
        assert_eq!(volatility_factor(&prices), 0.2);
    }

    #[test]
    fn test_forecast_days_bounds_and_dates() {
        let estimator = ConfidenceEstimator::new(80.0, 5.0);
        let anchor = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let days = estimator.forecast_days(&[101.0, 102.5, -3.0], anchor);

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(days[2].date, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());
        assert_eq!(days[2].predicted_price, 0.0);
        for day in &days {
            assert!(day.upper_bound >= day.predicted_price);
            assert!(day.predicted_price >= day.lower_bound);
            assert_eq!(day.sentiment_factor, 5.0);
        }
        assert_eq!(days[0].confidence, 85.0);
    }

    #[test]
    fn test_bounds_factor_range() {
        assert!((bounds_factor(90.0) - 1.2).abs() < 1e-12);
        assert!((bounds_factor(92.0) - 1.2).abs() < 1e-12);
        assert!((bounds_factor(35.0) - 2.3).abs() < 1e-12);
    }
}
