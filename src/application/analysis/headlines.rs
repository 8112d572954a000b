//! Batch headline sentiment: per-headline scores, buckets, themes and summary text.

use crate::domain::forecast::round_to;
use crate::domain::sentiment::{SentimentAnalyzer, SentimentLabel, TextSentiment};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

const BUCKET_THRESHOLD: f64 = 0.2;
const IMPACT_THRESHOLD: f64 = 0.1;
const THEME_SAMPLE: usize = 3;
const MAX_THEMES: usize = 5;

const THEMES: &[(&str, &[&str])] = &[
    ("Earnings", &["earnings", "profit", "revenue", "sales"]),
    ("Partnerships", &["partnership", "deal", "acquisition", "merger"]),
    ("Regulation", &["regulation", "regulatory", "compliance", "sec"]),
    ("Innovation", &["innovation", "technology", "ai", "digital"]),
    ("Market", &["market", "trading", "volatility", "price"]),
];

#[derive(Debug, Clone, Serialize)]
pub struct HeadlineResult {
    pub headline: String,
    pub sentiment_score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeSentiment {
    pub theme: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub total_headlines: usize,
    pub processed_headlines: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadlineAnalysis {
    pub overall_sentiment: f64,
    pub headline_results: Vec<HeadlineResult>,
    pub positive_summary: Vec<String>,
    pub negative_summary: Vec<String>,
    pub key_themes: Vec<ThemeSentiment>,
    pub market_impact: String,
    pub analysis_metadata: AnalysisMetadata,
}

/// Score a single text with scores and confidence rounded for display.
pub fn score_text(analyzer: &dyn SentimentAnalyzer, text: &str) -> TextSentiment {
    let raw = analyzer.analyze(text);
    TextSentiment {
        score: round_to(raw.score, 3),
        label: raw.label,
        confidence: round_to(raw.confidence, 3),
    }
}

fn positive_summary(count: usize) -> Vec<String> {
    [
        format!("Strong positive sentiment detected in {} headlines", count),
        "Market optimism reflected in recent news coverage".to_string(),
        "Favorable developments supporting bullish outlook".to_string(),
    ]
    .into_iter()
    .take(count.min(3))
    .collect()
}

fn negative_summary(count: usize) -> Vec<String> {
    [
        format!("Negative sentiment identified in {} headlines", count),
        "Market concerns reflected in recent coverage".to_string(),
    ]
    .into_iter()
    .take(count.min(2))
    .collect()
}

fn key_themes(results: &[HeadlineResult]) -> Vec<ThemeSentiment> {
    let lowered: Vec<String> = results.iter().map(|r| r.headline.to_lowercase()).collect();

    THEMES
        .iter()
        .filter_map(|(theme, keywords)| {
            let sample: Vec<f64> = results
                .iter()
                .zip(&lowered)
                .filter(|(_, text)| keywords.iter().any(|k| text.contains(k)))
                .take(THEME_SAMPLE)
                .map(|(r, _)| r.sentiment_score)
                .collect();

            if sample.is_empty() {
                return None;
            }
            Some(ThemeSentiment {
                theme: theme.to_string(),
                sentiment: round_to(sample.iter().sum::<f64>() / sample.len() as f64, 2),
            })
        })
        .take(MAX_THEMES)
        .collect()
}

fn market_impact(overall: f64, backend: &str) -> String {
    let direction = if overall > IMPACT_THRESHOLD {
        "positive"
    } else if overall < -IMPACT_THRESHOLD {
        "negative"
    } else {
        "neutral"
    };
    format!(
        "Based on {} analysis, expect {} market reaction",
        backend, direction
    )
}

/// Analyze up to `max_headlines` non-empty headlines.
pub fn analyze_headlines(
    analyzer: &dyn SentimentAnalyzer,
    headlines: &[String],
    max_headlines: usize,
) -> HeadlineAnalysis {
    let selected: Vec<&String> = headlines
        .iter()
        .take(max_headlines)
        .filter(|h| !h.trim().is_empty())
        .collect();

    let headline_results: Vec<HeadlineResult> = selected
        .par_iter()
        .map(|headline| {
            let sentiment = score_text(analyzer, headline);
            HeadlineResult {
                headline: (*headline).clone(),
                sentiment_score: sentiment.score,
                label: sentiment.label,
                confidence: sentiment.confidence,
            }
        })
        .collect();

    let overall = if headline_results.is_empty() {
        0.0
    } else {
        headline_results.iter().map(|r| r.sentiment_score).sum::<f64>()
            / headline_results.len() as f64
    };

    let positive_count = headline_results
        .iter()
        .filter(|r| r.sentiment_score > BUCKET_THRESHOLD)
        .count();
    let negative_count = headline_results
        .iter()
        .filter(|r| r.sentiment_score < -BUCKET_THRESHOLD)
        .count();
    let neutral_count = headline_results.len() - positive_count - negative_count;

    HeadlineAnalysis {
        overall_sentiment: round_to(overall, 3),
        positive_summary: positive_summary(positive_count),
        negative_summary: negative_summary(negative_count),
        key_themes: key_themes(&headline_results),
        market_impact: market_impact(overall, analyzer.name()),
        analysis_metadata: AnalysisMetadata {
            total_headlines: headlines.len(),
            processed_headlines: headline_results.len(),
            positive_count,
            negative_count,
            neutral_count,
            model_used: analyzer.name().to_string(),
            timestamp: Utc::now(),
        },
        headline_results,
    }
}
