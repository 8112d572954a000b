// Market analysis: indicators, correlation, confidence, headlines
pub mod analysis;

// Forecast model, feature preparation and training
pub mod ml;

// Request orchestration
pub mod prediction_service;
