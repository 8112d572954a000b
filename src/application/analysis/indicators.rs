use crate::domain::forecast::{TechnicalIndicators, round_to};
use statrs::statistics::{Data, Distribution};
use ta::Next;
use ta::indicators::SimpleMovingAverage;

const SMA_SHORT: usize = 20;
const SMA_LONG: usize = 50;
const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_WIDTH: f64 = 2.0;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trailing SMA over `period` points, or the mean of everything when the series is shorter.
pub fn trailing_sma(prices: &[f64], period: usize) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    if period == 0 || prices.len() < period {
        return mean(prices);
    }

    match SimpleMovingAverage::new(period) {
        Ok(mut sma) => prices[prices.len() - period..]
            .iter()
            .fold(0.0, |_, &p| sma.next(p)),
        Err(_) => mean(&prices[prices.len() - period..]),
    }
}

/// Simple-average RSI over the last `period` deltas.
///
/// 50 when fewer than `period` deltas exist or the window never moved, 100 when it
/// never fell.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Upper and lower Bollinger bands at two sample standard deviations.
pub fn bollinger_bands(prices: &[f64]) -> (f64, f64) {
    let last = prices.last().copied().unwrap_or(0.0);
    let fallback = (last * 1.02, last * 0.98);

    if prices.len() < BOLLINGER_PERIOD {
        return fallback;
    }

    let window = prices[prices.len() - BOLLINGER_PERIOD..].to_vec();
    let data = Data::new(window);
    match (data.mean(), data.std_dev()) {
        (Some(middle), Some(std)) if std > 0.0 && std.is_finite() => {
            (middle + BOLLINGER_WIDTH * std, middle - BOLLINGER_WIDTH * std)
        }
        _ => fallback,
    }
}

/// Indicator snapshot for a chronological close series; `None` for an empty series.
pub fn analyze_technical_indicators(prices: &[f64]) -> Option<TechnicalIndicators> {
    let current_price = *prices.last()?;
    let (upper, lower) = bollinger_bands(prices);

    Some(TechnicalIndicators {
        sma_20: round_to(trailing_sma(prices, SMA_SHORT), 2),
        sma_50: round_to(trailing_sma(prices, SMA_LONG), 2),
        rsi: round_to(rsi(prices, RSI_PERIOD), 2),
        bollinger_upper: round_to(upper, 2),
        bollinger_lower: round_to(lower, 2),
        current_price: round_to(current_price, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_series() {
        let prices = vec![100.0; 45];
        let indicators = analyze_technical_indicators(&prices).unwrap();

        assert_eq!(indicators.sma_20, 100.0);
        assert_eq!(indicators.sma_50, 100.0);
        assert_eq!(indicators.rsi, 50.0);
        assert_eq!(indicators.bollinger_upper, 102.0);
        assert_eq!(indicators.bollinger_lower, 98.0);
        assert_eq!(indicators.current_price, 100.0);
    }

    #[test]
    fn test_rsi_neutral_with_few_deltas() {
        let prices: Vec<f64> = (0..14).map(|i| 10.0 + i as f64).collect();
        assert_eq!(rsi(&prices, 14), 50.0);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14), 100.0);

        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&falling, 14), 0.0);
    }

    #[test]
    fn test_rsi_bounded() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 50.0 + (i as f64 * 1.3).sin() * 7.0 + (i as f64 * 0.2))
            .collect();
        for end in 15..prices.len() {
            let value = rsi(&prices[..end], 14);
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_short_series_sma_uses_all_points() {
        let prices = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(trailing_sma(&prices, 20), 2.5);
        assert_eq!(trailing_sma(&prices, 2), 3.5);
    }

    #[test]
    fn test_bollinger_fallback_for_short_series() {
        let (upper, lower) = bollinger_bands(&[50.0, 51.0]);
        assert!((upper - 52.02).abs() < 1e-9);
        assert!((lower - 49.98).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        let prices: Vec<f64> = (1..=20).map(f64::from).collect();
        let (upper, lower) = bollinger_bands(&prices);
        // mean 10.5, sample std sqrt(35)
        let std = 35.0f64.sqrt();
        assert!((upper - (10.5 + 2.0 * std)).abs() < 1e-9);
        assert!((lower - (10.5 - 2.0 * std)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series() {
        assert!(analyze_technical_indicators(&[]).is_none());
    }
}
