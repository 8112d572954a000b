//! MarketSense Server - forecasting and sentiment HTTP service
//!
//! # Usage
//! ```sh
//! ML_SERVICE_PORT=5000 SENTIMENT_BACKEND=keyword cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `ML_SERVICE_PORT` - Listen port (default: 5000)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `MAX_CONCURRENT_TRAININGS` - Trainings allowed to run at once (default: 2)

use anyhow::{Context, Result};
use marketsense::config::Config;
use marketsense::infrastructure::observability::init_tracing;
use marketsense::interfaces::{AppState, router};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.server.log_format)?;

    info!("MarketSense Server {} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: sequence_length={}, max_epochs={}, max_concurrent_trainings={}, backend={}",
        config.model.sequence_length,
        config.model.max_epochs,
        config.service.max_concurrent_trainings,
        config.service.sentiment_backend
    );

    let state = AppState::from_config(&config)?;
    let app = router(state);

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received. Exiting...");
        })
        .await?;

    Ok(())
}
