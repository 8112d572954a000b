//! axum router for the long-running service.

use super::api::{self, ApiError, ApiResult, AppState};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

fn respond(result: ApiResult) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn health(State(state): State<AppState>) -> Response {
    respond(api::health(&state))
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    respond(api::predict(&state, &body).await)
}

async fn analyze_sentiment(State(state): State<AppState>, body: Bytes) -> Response {
    respond(api::analyze_sentiment(&state, &body).await)
}

async fn analyze_single(State(state): State<AppState>, body: Bytes) -> Response {
    respond(api::analyze_single(&state, &body).await)
}

async fn technical_indicators(State(state): State<AppState>, body: Bytes) -> Response {
    respond(api::technical_indicators(&state, &body))
}

async fn metrics(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict-price-enhanced", post(predict))
        .route("/analyze-sentiment", post(analyze_sentiment))
        .route("/analyze-single", post(analyze_single))
        .route("/technical-indicators", post(technical_indicators))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
