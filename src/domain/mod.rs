// Domain-specific error types
pub mod errors;

// Forecast output types
pub mod forecast;

// Price and sentiment observations
pub mod market;

// Text sentiment contracts
pub mod sentiment;
