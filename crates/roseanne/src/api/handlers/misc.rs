//! Miscellaneous handlers (health, method fallback).

use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Store backend in use.
    pub database: &'static str,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        database: state.store.backend(),
    })
}

/// Fallback for unsupported methods on a known path.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
