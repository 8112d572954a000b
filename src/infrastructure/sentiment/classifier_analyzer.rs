use crate::domain::sentiment::{
    Classification, SentimentAnalyzer, SentimentLabel, TextClassifier, TextSentiment,
};
use std::sync::Arc;

/// Classifier input limit, in characters.
const MAX_INPUT_CHARS: usize = 512;

/// Maps a `(label, confidence)` classifier onto signed sentiment scores.
pub struct ClassifierSentimentAnalyzer {
    classifier: Arc<dyn TextClassifier>,
}

impl ClassifierSentimentAnalyzer {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }
}

impl SentimentAnalyzer for ClassifierSentimentAnalyzer {
    fn analyze(&self, text: &str) -> TextSentiment {
        let cleaned: String = text.trim().chars().take(MAX_INPUT_CHARS).collect();
        if cleaned.is_empty() {
            return TextSentiment::neutral(0.0);
        }

        let Classification { label, confidence } = self.classifier.classify(&cleaned);
        let confidence = confidence.clamp(0.0, 1.0);
        let score = match label {
            SentimentLabel::Positive => confidence,
            SentimentLabel::Negative => -confidence,
            SentimentLabel::Neutral => 0.0,
        };

        TextSentiment {
            score,
            label,
            confidence,
        }
    }

    fn name(&self) -> &str {
        self.classifier.model_name()
    }
}
