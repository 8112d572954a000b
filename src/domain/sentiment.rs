use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Polarity of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextSentiment {
    /// Signed score in [-1, 1]
    pub score: f64,
    pub label: SentimentLabel,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

impl TextSentiment {
    pub fn neutral(confidence: f64) -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            confidence,
        }
    }
}

/// Raw output of a text classifier: the winning label and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Opaque text -> (label, score) classifier, e.g. a FinBERT-style model.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;

    /// Model identifier reported in responses
    fn model_name(&self) -> &str;
}

/// Sentiment scoring capability shared by every endpoint.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> TextSentiment;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serializes_lowercase() {
        let json = serde_json::to_string(&SentimentLabel::Positive).unwrap();
        assert_eq!(json, "\"positive\"");
        assert_eq!(SentimentLabel::Neutral.to_string(), "neutral");
    }
}
