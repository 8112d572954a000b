use crate::domain::sentiment::{SentimentAnalyzer, SentimentLabel, TextSentiment};

const POSITIVE_WORDS: &[&str] = &[
    "growth", "profit", "rise", "gain", "up", "bullish", "increase", "higher", "positive", "jump",
];

const NEGATIVE_WORDS: &[&str] = &[
    "drop", "fall", "loss", "down", "bearish", "decline", "lower", "negative", "risk", "concern",
];

const CONFIDENCE: f64 = 0.8;

/// Word-count heuristic; deterministic and dependency free.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSentimentAnalyzer;

impl KeywordSentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn count_matches(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

impl SentimentAnalyzer for KeywordSentimentAnalyzer {
    fn analyze(&self, text: &str) -> TextSentiment {
        let lowered = text.to_lowercase();
        let positive = count_matches(&lowered, POSITIVE_WORDS);
        let negative = count_matches(&lowered, NEGATIVE_WORDS);

        if positive > negative {
            let delta = (positive - negative) as f64;
            TextSentiment {
                score: (0.5 + 0.1 * delta).min(0.9),
                label: SentimentLabel::Positive,
                confidence: CONFIDENCE,
            }
        } else if negative > positive {
            let delta = (negative - positive) as f64;
            TextSentiment {
                score: (-0.5 - 0.1 * delta).max(-0.9),
                label: SentimentLabel::Negative,
                confidence: CONFIDENCE,
            }
        } else {
            TextSentiment::neutral(CONFIDENCE)
        }
    }

    fn name(&self) -> &str {
        "keyword-heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_is_positive() {
        let result = KeywordSentimentAnalyzer.analyze("Company reports strong GROWTH");
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!((result.score - 0.6).abs() < 1e-12);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_scores_are_capped() {
        let result = KeywordSentimentAnalyzer
            .analyze("drop fall loss down bearish decline lower negative risk concern");
        assert_eq!(result.label, SentimentLabel::Negative);
        assert_eq!(result.score, -0.9);
    }

    #[test]
    fn test_balanced_text_is_neutral() {
        let result = KeywordSentimentAnalyzer.analyze("profit rose but risk remains");
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.score, 0.0);
    }
}
