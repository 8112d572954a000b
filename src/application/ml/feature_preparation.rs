//! Multi-modal feature preparation.
//!
//! Aligns the sentiment stream to the price stream, scales both to [0, 1] and cuts
//! sequence-to-one training windows:
//!
//! ```text
//! prices    p0 p1 ... p29 | p30        -> window 0, target p30
//!              p1 ... p30 | p31        -> window 1, target p31
//! sentiment s0 s1 ... s29              (parallel, 3 columns)
//! ```

use super::scaler::MinMaxScaler;
use crate::domain::errors::ForecastError;
use crate::domain::market::{NEUTRAL_SENTIMENT, PricePoint, SentimentPoint, closes};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, Array3, s};
use std::collections::HashMap;
use tracing::debug;

/// Training needs at least this many windows.
pub const MIN_TRAINING_WINDOWS: usize = 10;

/// Number of sentiment feature columns (score, news count, buzz).
pub const SENTIMENT_FEATURES: usize = 3;

/// Sentiment aligned one-to-one with the price series.
#[derive(Debug, Clone)]
pub struct AlignedSentiment {
    pub points: Vec<SentimentPoint>,
    /// Entries filled with neutral sentiment
    pub filled: usize,
}

/// Extend `sentiment` with neutral entries at the tail until it reaches `target_len`.
///
/// Returns a new sequence; longer inputs are truncated to `target_len`.
pub fn pad_sentiment(sentiment: &[SentimentPoint], target_len: usize) -> Vec<SentimentPoint> {
    let mut padded: Vec<SentimentPoint> = sentiment.iter().take(target_len).copied().collect();
    padded.resize(target_len, NEUTRAL_SENTIMENT);
    padded
}

/// Align sentiment to prices.
///
/// When every price and every sentiment entry is dated, entries are joined by date and
/// price days without news become neutral; two entries on the same date are rejected.
/// Otherwise the series are matched by position.
pub fn align_sentiment(
    prices: &[PricePoint],
    sentiment: &[SentimentPoint],
) -> Result<AlignedSentiment, ForecastError> {
    let all_dated = !sentiment.is_empty()
        && prices.iter().all(|p| p.date.is_some())
        && sentiment.iter().all(|s| s.date.is_some());

    if all_dated {
        let mut by_date: HashMap<NaiveDate, SentimentPoint> =
            HashMap::with_capacity(sentiment.len());
        for (idx, point) in sentiment.iter().enumerate() {
            let Some(date) = point.date else { continue };
            if by_date.insert(date, *point).is_some() {
                return Err(ForecastError::Validation(format!(
                    "sentiment_data[{}] repeats date {}",
                    idx, date
                )));
            }
        }

        let mut filled = 0;
        let points = prices
            .iter()
            .map(|p| match p.date.and_then(|d| by_date.get(&d)) {
                Some(point) => *point,
                None => {
                    filled += 1;
                    SentimentPoint::neutral_on(p.date)
                }
            })
            .collect();

        return Ok(AlignedSentiment { points, filled });
    }

    Ok(AlignedSentiment {
        points: pad_sentiment(sentiment, prices.len()),
        filled: prices.len().saturating_sub(sentiment.len()),
    })
}

/// Scaled series plus the supervised windows cut from them.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub sequence_length: usize,
    /// (windows, sequence_length)
    pub price_windows: Array2<f64>,
    /// (windows, sequence_length, 3)
    pub sentiment_windows: Array3<f64>,
    /// (windows,)
    pub targets: Array1<f64>,
    pub scaled_prices: Array1<f64>,
    /// (observations, 3)
    pub scaled_sentiment: Array2<f64>,
    pub price_scaler: MinMaxScaler,
    pub sentiment_scaler: MinMaxScaler,
    pub filled_sentiment: usize,
}

impl PreparedFeatures {
    pub fn window_count(&self) -> usize {
        self.targets.len()
    }

    /// Most recent `sequence_length` scaled observations, used to seed the roll-out.
    pub fn latest_window(&self) -> (Vec<f64>, Array2<f64>) {
        let n = self.scaled_prices.len();
        let start = n - self.sequence_length;
        let prices = self.scaled_prices.slice(s![start..]).to_vec();
        let sentiment = self.scaled_sentiment.slice(s![start.., ..]).to_owned();
        (prices, sentiment)
    }
}

/// Build scaled windows from raw observations.
pub fn prepare_features(
    prices: &[PricePoint],
    sentiment: &[SentimentPoint],
    sequence_length: usize,
) -> Result<PreparedFeatures, ForecastError> {
    if sequence_length == 0 {
        return Err(ForecastError::Validation(
            "sequence length must be positive".to_string(),
        ));
    }

    let windows = prices.len().saturating_sub(sequence_length);
    if windows < MIN_TRAINING_WINDOWS {
        return Err(ForecastError::InsufficientData {
            windows,
            required: MIN_TRAINING_WINDOWS,
        });
    }

    let close_series = closes(prices);
    let aligned = align_sentiment(prices, sentiment)?;

    let mut sentiment_matrix = Array2::<f64>::zeros((prices.len(), SENTIMENT_FEATURES));
    for (mut row, point) in sentiment_matrix.rows_mut().into_iter().zip(&aligned.points) {
        row.assign(&Array1::from(point.features().to_vec()));
    }

    let price_scaler = MinMaxScaler::fit_series(&close_series)?;
    let sentiment_scaler = MinMaxScaler::fit(sentiment_matrix.view())?;

    let scaled_prices = Array1::from(price_scaler.transform_series(&close_series));
    let scaled_sentiment = sentiment_scaler.transform(sentiment_matrix.view());

    let mut price_windows = Array2::<f64>::zeros((windows, sequence_length));
    let mut sentiment_windows =
        Array3::<f64>::zeros((windows, sequence_length, SENTIMENT_FEATURES));
    let mut targets = Array1::<f64>::zeros(windows);

    for w in 0..windows {
        let end = w + sequence_length;
        price_windows
            .row_mut(w)
            .assign(&scaled_prices.slice(s![w..end]));
        sentiment_windows
            .slice_mut(s![w, .., ..])
            .assign(&scaled_sentiment.slice(s![w..end, ..]));
        targets[w] = scaled_prices[end];
    }

    debug!(
        "Prepared {} windows (sequence {}, {} neutral sentiment fills)",
        windows, sequence_length, aligned.filled
    );

    Ok(PreparedFeatures {
        sequence_length,
        price_windows,
        sentiment_windows,
        targets,
        scaled_prices,
        scaled_sentiment,
        price_scaler,
        sentiment_scaler,
        filled_sentiment: aligned.filled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_prices(n: usize) -> Vec<PricePoint> {
        (0..n)
            .map(|i| PricePoint::new(100.0 + i as f64 + (i as f64 * 0.7).sin()))
            .collect()
    }

    #[test]
    fn test_pad_sentiment_appends_neutral_tail() {
        let supplied: Vec<SentimentPoint> = (0..20)
            .map(|i| SentimentPoint::new(0.5, i + 2, 2.0))
            .collect();

        let padded = pad_sentiment(&supplied, 50);

        assert_eq!(padded.len(), 50);
        assert_eq!(&padded[..20], &supplied[..]);
        assert!(padded[20..].iter().all(|p| *p == NEUTRAL_SENTIMENT));
        // caller data untouched
        assert_eq!(supplied.len(), 20);
    }

    #[test]
    fn test_pad_sentiment_truncates_longer_input() {
        let supplied = vec![SentimentPoint::new(0.2, 3, 1.5); 12];
        assert_eq!(pad_sentiment(&supplied, 5).len(), 5);
    }

    #[test]
    fn test_padding_scenario_fifty_prices_twenty_sentiment() {
        let prices = trending_prices(50);
        let sentiment: Vec<SentimentPoint> = (0..20)
            .map(|i| SentimentPoint::new(0.1 * (i % 5) as f64, 4, 1.2))
            .collect();

        let aligned = align_sentiment(&prices, &sentiment).unwrap();
        assert_eq!(aligned.filled, 30);
        assert_eq!(aligned.points.len(), 50);

        let features = prepare_features(&prices, &sentiment, 30).unwrap();
        assert_eq!(features.filled_sentiment, 30);
        assert_eq!(features.window_count(), 20);
        assert_eq!(features.sentiment_windows.dim(), (20, 30, 3));
    }

    #[test]
    fn test_date_alignment_fills_missing_days() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let prices: Vec<PricePoint> = (0..5)
            .map(|i| PricePoint::dated(start + chrono::Days::new(i), 100.0 + i as f64))
            .collect();
        let sentiment = vec![SentimentPoint {
            date: Some(start + chrono::Days::new(2)),
            sentiment_score: 0.8,
            news_count: 9,
            buzz_score: 3.0,
        }];

        let aligned = align_sentiment(&prices, &sentiment).unwrap();

        assert_eq!(aligned.filled, 4);
        assert_eq!(aligned.points[2].sentiment_score, 0.8);
        assert_eq!(aligned.points[0].news_count, 1);
        assert_eq!(aligned.points[4].date, prices[4].date);
    }

    #[test]
    fn test_duplicate_sentiment_dates_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let prices: Vec<PricePoint> = (0..45)
            .map(|i| PricePoint::dated(start + chrono::Days::new(i), 50.0 + i as f64))
            .collect();
        let day = Some(start + chrono::Days::new(4));
        let sentiment = vec![
            SentimentPoint {
                date: day,
                ..SentimentPoint::new(0.6, 2, 1.0)
            },
            SentimentPoint {
                date: day,
                ..SentimentPoint::new(-0.4, 5, 2.0)
            },
        ];

        let err = align_sentiment(&prices, &sentiment).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
        assert!(err.to_string().contains("sentiment_data[1] repeats date 2025-03-05"));
        assert!(prepare_features(&prices, &sentiment, 30).is_err());
    }

    #[test]
    fn test_window_count_and_shape() {
        for n in [40, 45, 73] {
            let prices = trending_prices(n);
            let features = prepare_features(&prices, &[], 30).unwrap();

            assert_eq!(features.window_count(), n - 30);
            assert_eq!(features.price_windows.dim(), (n - 30, 30));
            // target of window w is the scaled price right after it
            assert_eq!(features.targets[0], features.scaled_prices[30]);
            assert_eq!(features.price_windows[[1, 0]], features.scaled_prices[1]);
        }
    }

    #[test]
    fn test_too_few_prices_rejected() {
        let prices = trending_prices(39);
        let err = prepare_features(&prices, &[], 30).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData {
                windows: 9,
                required: 10
            }
        ));
    }

    #[test]
    fn test_latest_window_is_tail() {
        let prices = trending_prices(45);
        let features = prepare_features(&prices, &[], 30).unwrap();
        let (price_window, sentiment_window) = features.latest_window();

        assert_eq!(price_window.len(), 30);
        assert_eq!(sentiment_window.dim(), (30, 3));
        assert_eq!(*price_window.last().unwrap(), features.scaled_prices[44]);
    }
}
