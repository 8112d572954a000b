//! Gateway event bridge: one API Gateway proxy event per stdin line, one response per
//! stdout line.
//!
//! ```sh
//! echo '{"httpMethod":"POST","path":"/analyze-single","body":"{\"text\":\"Shares rally\"}"}' \
//!     | cargo run --bin lambda_event
//! ```

use anyhow::{Context, Result};
use marketsense::config::Config;
use marketsense::interfaces::{AppState, handle_raw_event};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the responses
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;
    info!(
        "Gateway bridge ready, backend={}",
        config.service.sentiment_backend
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read event")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_raw_event(&state, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
        handled += 1;
    }

    info!("Input closed after {} events", handled);
    Ok(())
}
