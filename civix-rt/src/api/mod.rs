//! HTTP API handlers for civix-rt

pub mod health;
pub mod identity;
pub mod maps;
pub mod reports;

use axum::Json;
use serde::Serialize;

pub use health::health_routes;
pub use identity::{identity_middleware, ActingIdentity, IdentityResolver, UuidTokenResolver};
pub use maps::check_boundaries;
pub use reports::{
    create_report, delete_report, get_report, list_nearby, list_reports, my_reports,
    update_report, update_status,
};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub(crate) fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
