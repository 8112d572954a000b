//! Observability for MarketSense
//!
//! 1. **Structured logs**: `tracing` to stdout, pretty for terminals or JSON for log shippers
//! 2. **Prometheus metrics**: pulled from the `/metrics` route of the HTTP server

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{InFlightGuard, Metrics};
