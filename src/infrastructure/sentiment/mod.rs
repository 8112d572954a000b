//! Sentiment analyzer backends.

pub mod classifier_analyzer;
pub mod keyword_analyzer;
pub mod lexicon_classifier;

pub use classifier_analyzer::ClassifierSentimentAnalyzer;
pub use keyword_analyzer::KeywordSentimentAnalyzer;
pub use lexicon_classifier::LexiconClassifier;

use crate::config::SentimentBackend;
use crate::domain::sentiment::SentimentAnalyzer;
use std::sync::Arc;
use tracing::info;

/// Build the analyzer selected by configuration.
pub fn build_analyzer(backend: SentimentBackend) -> Arc<dyn SentimentAnalyzer> {
    let analyzer: Arc<dyn SentimentAnalyzer> = match backend {
        SentimentBackend::Keyword => Arc::new(KeywordSentimentAnalyzer::new()),
        SentimentBackend::Classifier => Arc::new(ClassifierSentimentAnalyzer::new(Arc::new(
            LexiconClassifier::new(),
        ))),
    };
    info!("Sentiment backend: {} ({})", backend, analyzer.name());
    analyzer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::SentimentLabel;

    #[test]
    fn test_backends_by_config() {
        let keyword = build_analyzer(SentimentBackend::Keyword);
        assert_eq!(keyword.name(), "keyword-heuristic");

        let classifier = build_analyzer(SentimentBackend::Classifier);
        assert_eq!(classifier.name(), "vader-financial");
        assert_eq!(
            classifier.analyze("Stock soars to record high").label,
            SentimentLabel::Positive
        );
    }
}
