use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily closing price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: Option<NaiveDate>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(close: f64) -> Self {
        Self { date: None, close }
    }

    pub fn dated(date: NaiveDate, close: f64) -> Self {
        Self {
            date: Some(date),
            close,
        }
    }
}

/// Aggregated news sentiment for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: Option<NaiveDate>,
    /// Polarity in [-1, 1]
    pub sentiment_score: f64,
    pub news_count: u32,
    pub buzz_score: f64,
}

/// Filler used for every day without news: no polarity, one article, unit buzz.
pub const NEUTRAL_SENTIMENT: SentimentPoint = SentimentPoint {
    date: None,
    sentiment_score: 0.0,
    news_count: 1,
    buzz_score: 1.0,
};

impl SentimentPoint {
    pub fn new(sentiment_score: f64, news_count: u32, buzz_score: f64) -> Self {
        Self {
            date: None,
            sentiment_score,
            news_count,
            buzz_score,
        }
    }

    pub fn neutral_on(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            ..NEUTRAL_SENTIMENT
        }
    }

    /// Feature vector in model column order: score, news count, buzz.
    pub fn features(&self) -> [f64; 3] {
        [
            self.sentiment_score,
            f64::from(self.news_count),
            self.buzz_score,
        ]
    }
}

/// Flat close series in chronological order.
pub fn closes(prices: &[PricePoint]) -> Vec<f64> {
    prices.iter().map(|p| p.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_features() {
        assert_eq!(NEUTRAL_SENTIMENT.features(), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_neutral_on_keeps_date() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let point = SentimentPoint::neutral_on(Some(date));
        assert_eq!(point.date, Some(date));
        assert_eq!(point.news_count, 1);
    }
}
