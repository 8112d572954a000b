//! API Gateway proxy adapter.
//!
//! Events are routed by path when one is given, otherwise by the keys present in the
//! JSON body, so the same function can sit behind a single catch-all integration.
//! The `lambda_event` binary drives [`handle_raw_event`] from newline-delimited
//! events on stdin.

use super::api::{self, ApiError, ApiResult, AppState};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Predict,
    AnalyzeSentiment,
    AnalyzeSingle,
    TechnicalIndicators,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        let last = path.trim_end_matches('/').rsplit('/').next()?;
        match last {
            "health" => Some(Route::Health),
            "predict-price-enhanced" => Some(Route::Predict),
            "analyze-sentiment" => Some(Route::AnalyzeSentiment),
            "analyze-single" => Some(Route::AnalyzeSingle),
            "technical-indicators" => Some(Route::TechnicalIndicators),
            _ => None,
        }
    }

    fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;
        if object.contains_key("headlines") {
            Some(Route::AnalyzeSentiment)
        } else if object.contains_key("text") {
            Some(Route::AnalyzeSingle)
        } else if object.contains_key("price_data") {
            Some(Route::Predict)
        } else if object.contains_key("prices") {
            Some(Route::TechnicalIndicators)
        } else {
            None
        }
    }

    /// Path first, then body shape, then health.
    pub fn resolve(event: &ApiGatewayEvent) -> Self {
        event
            .path
            .as_deref()
            .and_then(Route::from_path)
            .or_else(|| event.body.as_deref().and_then(Route::from_body))
            .unwrap_or(Route::Health)
    }
}

fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "GET,POST,OPTIONS".to_string(),
        ),
        ("Content-Type".to_string(), "application/json".to_string()),
    ])
}

fn into_response(result: ApiResult) -> LambdaResponse {
    let (status, body) = match result {
        Ok(value) => (StatusCode::OK, value.to_string()),
        Err(err) => (
            err.status,
            serde_json::to_string(&err.body()).unwrap_or_else(|_| "{}".to_string()),
        ),
    };
    LambdaResponse {
        status_code: status.as_u16(),
        headers: cors_headers(),
        body,
    }
}

pub async fn handle_event(state: &AppState, event: ApiGatewayEvent) -> LambdaResponse {
    if event
        .http_method
        .as_deref()
        .is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS"))
    {
        return LambdaResponse {
            status_code: StatusCode::OK.as_u16(),
            headers: cors_headers(),
            body: String::new(),
        };
    }

    let body = event.body.as_deref().unwrap_or_default().as_bytes();
    let result = match Route::resolve(&event) {
        Route::Health => api::health(state),
        Route::Predict => api::predict(state, body).await,
        Route::AnalyzeSentiment => api::analyze_sentiment(state, body).await,
        Route::AnalyzeSingle => api::analyze_single(state, body).await,
        Route::TechnicalIndicators => api::technical_indicators(state, body),
    };
    into_response(result)
}

/// Decode one serialized gateway event and dispatch it. Undecodable events get a 400.
pub async fn handle_raw_event(state: &AppState, raw: &str) -> LambdaResponse {
    match serde_json::from_str::<ApiGatewayEvent>(raw) {
        Ok(event) => handle_event(state, event).await,
        Err(e) => into_response(Err(ApiError::bad_request(format!(
            "Invalid gateway event: {}",
            e
        )))),
    }
}
