//! Local lexicon classifier using VADER
//!
//! Produces FinBERT-shaped `(label, confidence)` outputs from VADER's compound score,
//! enhanced with equity-market keyword boosting.
//!
//! # Example
//! ```rust,ignore
//! use marketsense::infrastructure::sentiment::LexiconClassifier;
//! use marketsense::domain::sentiment::{SentimentLabel, TextClassifier};
//!
//! let classifier = LexiconClassifier::new();
//! let result = classifier.classify("Shares soar after record quarterly revenue");
//! assert_eq!(result.label, SentimentLabel::Positive);
//! ```

use crate::domain::sentiment::{Classification, SentimentLabel, TextClassifier};
use vader_sentiment::SentimentIntensityAnalyzer;

/// Market jargon VADER's general lexicon under-weights.
const BULLISH_KEYWORDS: &[(&str, f64)] = &[
    ("surge", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soar", 0.5),
    ("bullish", 0.5),
    ("all-time high", 0.5),
    ("record high", 0.4),
    ("beats estimates", 0.5),
    ("beat estimates", 0.5),
    ("outperform", 0.4),
    ("upgrade", 0.3),
    ("raises guidance", 0.5),
    ("buyback", 0.3),
    ("dividend increase", 0.4),
    ("breakout", 0.3),
    ("growth", 0.2),
    ("partnership", 0.2),
    ("breakthrough", 0.4),
    ("expansion", 0.2),
];

const BEARISH_KEYWORDS: &[(&str, f64)] = &[
    ("crash", -0.5),
    ("plunge", -0.5),
    ("tumble", -0.4),
    ("slump", -0.4),
    ("bearish", -0.5),
    ("collapse", -0.5),
    ("misses estimates", -0.5),
    ("missed estimates", -0.5),
    ("downgrade", -0.4),
    ("cuts guidance", -0.5),
    ("profit warning", -0.5),
    ("lawsuit", -0.4),
    ("investigation", -0.3),
    ("recall", -0.3),
    ("layoffs", -0.3),
    ("bankruptcy", -0.6),
    ("fraud", -0.5),
    ("sell-off", -0.4),
    ("selloff", -0.4),
];

/// VADER's conventional neutral band on the compound score.
const NEUTRAL_BAND: f64 = 0.05;

pub struct LexiconClassifier {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn financial_boost(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();

        BULLISH_KEYWORDS
            .iter()
            .chain(BEARISH_KEYWORDS)
            .filter(|(keyword, _)| text_lower.contains(keyword))
            .map(|(_, score)| score)
            .sum()
    }

    /// Signed polarity in [-1, 1]: VADER compound plus half the keyword boost.
    pub fn polarity(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or(0.0);

        (compound + self.financial_boost(text) * 0.5).clamp(-1.0, 1.0)
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Classification {
        let polarity = self.polarity(text);

        // confidence behaves like the winning class probability
        if polarity >= NEUTRAL_BAND {
            Classification {
                label: SentimentLabel::Positive,
                confidence: 0.5 + polarity / 2.0,
            }
        } else if polarity <= -NEUTRAL_BAND {
            Classification {
                label: SentimentLabel::Negative,
                confidence: 0.5 - polarity / 2.0,
            }
        } else {
            Classification {
                label: SentimentLabel::Neutral,
                confidence: 1.0 - polarity.abs(),
            }
        }
    }

    fn model_name(&self) -> &str {
        "vader-financial"
    }
}
