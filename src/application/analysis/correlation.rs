use crate::domain::forecast::{ImpactStrength, SentimentImpact, round_to};
use crate::domain::market::SentimentPoint;

const MIN_SENTIMENT_POINTS: usize = 5;
const MIN_ALIGNED_PAIRS: usize = 4;
const DIRECTION_THRESHOLD: f64 = 0.3;

/// Day-over-day percentage changes. A zero previous price yields a 0% change.
pub fn percentage_changes(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] != 0.0 {
                (w[1] - w[0]) / w[0] * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Pearson correlation of two equally long series; 0 when undefined.
pub fn pearson_correlation(v1: &[f64], v2: &[f64]) -> f64 {
    let len = v1.len().min(v2.len());
    if len < 2 {
        return 0.0;
    }

    let v1 = &v1[..len];
    let v2 = &v2[..len];

    let mean1 = v1.iter().sum::<f64>() / len as f64;
    let mean2 = v2.iter().sum::<f64>() / len as f64;

    let mut numer = 0.0;
    let mut denom1 = 0.0;
    let mut denom2 = 0.0;

    for (a, b) in v1.iter().zip(v2) {
        let diff1 = a - mean1;
        let diff2 = b - mean2;
        numer += diff1 * diff2;
        denom1 += diff1 * diff1;
        denom2 += diff2 * diff2;
    }

    if denom1 == 0.0 || denom2 == 0.0 {
        return 0.0;
    }

    let r = numer / (denom1.sqrt() * denom2.sqrt());
    if r.is_finite() { r } else { 0.0 }
}

fn describe(correlation: f64) -> &'static str {
    if correlation > DIRECTION_THRESHOLD {
        "Strong positive correlation: sentiment tends to predict price direction"
    } else if correlation < -DIRECTION_THRESHOLD {
        "Negative correlation: sentiment often contrarian to price moves"
    } else {
        "Weak correlation: sentiment has limited predictive power"
    }
}

/// How the supplied sentiment scores track realised price changes.
///
/// Alignment is positional: sentiment entry `k` is paired with the change from
/// day `k` to day `k + 1`, truncated to the shorter series.
pub fn analyze_sentiment_price_correlation(
    prices: &[f64],
    sentiment: &[SentimentPoint],
) -> SentimentImpact {
    if sentiment.len() < MIN_SENTIMENT_POINTS {
        return SentimentImpact {
            correlation: 0.0,
            impact_strength: ImpactStrength::Low,
            analysis: "Insufficient sentiment data".to_string(),
            data_points: 0,
        };
    }

    let changes = percentage_changes(prices);
    let scores: Vec<f64> = sentiment.iter().map(|s| s.sentiment_score).collect();
    let aligned = changes.len().min(scores.len());

    let correlation = if aligned >= MIN_ALIGNED_PAIRS {
        pearson_correlation(&scores[..aligned], &changes[..aligned])
    } else {
        0.0
    };

    SentimentImpact {
        correlation: round_to(correlation, 3),
        impact_strength: ImpactStrength::from_correlation(correlation),
        analysis: describe(correlation).to_string(),
        data_points: aligned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f64]) -> Vec<SentimentPoint> {
        values.iter().map(|&s| SentimentPoint::new(s, 3, 1.0)).collect()
    }

    #[test]
    fn test_too_little_sentiment_is_low_default() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let impact = analyze_sentiment_price_correlation(&prices, &scores(&[0.1, 0.2, 0.3, 0.4]));

        assert_eq!(impact.correlation, 0.0);
        assert_eq!(impact.impact_strength, ImpactStrength::Low);
        assert_eq!(impact.data_points, 0);
    }

    #[test]
    fn test_positive_correlation_detected() {
        // price change on day k follows the sign of sentiment k
        let sentiment = [0.5, -0.5, 0.6, -0.4, 0.7, -0.6, 0.4, -0.3];
        let mut prices = vec![100.0];
        for s in sentiment {
            let last = *prices.last().unwrap();
            prices.push(last * (1.0 + s / 10.0));
        }

        let impact = analyze_sentiment_price_correlation(&prices, &scores(&sentiment));

        assert!(impact.correlation > 0.9);
        assert_eq!(impact.impact_strength, ImpactStrength::High);
        assert!(impact.analysis.starts_with("Strong positive"));
        assert_eq!(impact.data_points, 8);
    }

    #[test]
    fn test_constant_sentiment_is_zero() {
        let prices: Vec<f64> = (0..20).map(|i| 50.0 + (i % 3) as f64).collect();
        let impact = analyze_sentiment_price_correlation(&prices, &scores(&[0.2; 10]));

        assert_eq!(impact.correlation, 0.0);
        assert!(impact.analysis.starts_with("Weak"));
        assert_eq!(impact.data_points, 10);
    }

    #[test]
    fn test_percentage_changes_handles_zero_price() {
        assert_eq!(percentage_changes(&[0.0, 5.0, 10.0]), vec![0.0, 100.0]);
    }
}
