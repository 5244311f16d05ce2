//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub reports: i64,
    pub indexed_reports: Option<usize>,
}

/// GET /health
///
/// No authentication. `indexed_reports` is null while the location index is
/// unavailable.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let store = state.service.store();
    let reports = store.count().await?;
    let indexed_reports = store.index().len().ok();
    let uptime_seconds = (chrono::Utc::now() - state.startup_time).num_seconds();

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        module: "civix-rt".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        reports,
        indexed_reports,
    }))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
