//! Offline forecast from CSV files.
//!
//! ```sh
//! cargo run --bin forecast -- --prices data/aapl.csv --sentiment data/aapl_news.csv --days 5
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use marketsense::application::ml::ForecasterConfig;
use marketsense::application::prediction_service::{
    PredictionRequest, run_forecast, validate_request,
};
use marketsense::config::Config;
use marketsense::domain::market::{PricePoint, SentimentPoint};
use marketsense::interfaces::dto::{SentimentInput, parse_date};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Debug, Deserialize)]
struct PriceRecord {
    date: String,
    close: f64,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV with `date,close` columns, oldest first
    #[arg(long)]
    prices: PathBuf,

    /// Optional CSV with `date,sentiment_score,news_count,buzz_score` columns
    #[arg(long)]
    sentiment: Option<PathBuf>,

    #[arg(long, default_value = "TICKER")]
    ticker: String,

    /// Days to forecast (default: DEFAULT_PREDICTION_DAYS)
    #[arg(long)]
    days: Option<usize>,

    /// Override MAX_EPOCHS
    #[arg(long)]
    epochs: Option<usize>,

    /// Override TRAINING_SEED for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn load_prices(path: &Path) -> Result<Vec<PricePoint>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut points = Vec::new();
    for (line, record) in reader.deserialize::<PriceRecord>().enumerate() {
        let record = record.with_context(|| format!("Bad price row {}", line + 1))?;
        points.push(PricePoint::dated(parse_date(&record.date)?, record.close));
    }
    Ok(points)
}

fn load_sentiment(path: &Path) -> Result<Vec<SentimentPoint>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut points = Vec::new();
    for (line, record) in reader.deserialize::<SentimentInput>().enumerate() {
        let record = record.with_context(|| format!("Bad sentiment row {}", line + 1))?;
        points.push(record.into_point()?);
    }
    Ok(points)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the JSON report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(epochs) = args.epochs {
        config.model.max_epochs = epochs;
    }
    if args.seed.is_some() {
        config.model.training_seed = args.seed;
    }
    config.model.validate()?;

    let prices = load_prices(&args.prices)?;
    let sentiment = match &args.sentiment {
        Some(path) => load_sentiment(path)?,
        None => Vec::new(),
    };
    info!(
        "Loaded {} prices and {} sentiment rows",
        prices.len(),
        sentiment.len()
    );

    let request = PredictionRequest {
        ticker: args.ticker.trim().to_uppercase(),
        prices,
        sentiment,
        prediction_days: args.days.unwrap_or(config.service.default_prediction_days),
    };
    validate_request(&request, &config.service)?;

    let (report, training) = run_forecast(
        &request,
        &ForecasterConfig::from(&config.model),
        config.model.sequence_length,
    )?;
    info!(
        "Trained {} epochs in {:?} ({:?})",
        training.epochs_trained, training.duration, training.stop_reason
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
