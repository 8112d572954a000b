use crate::config::LogFormat;
use tracing::Level;
use tracing_subscriber::prelude::*;

/// Install the global subscriber: `RUST_LOG` filter with an INFO floor, then either
/// pretty or JSON output on stdout.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    Ok(())
}
