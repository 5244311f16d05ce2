//! civix-rt library - Report Tracker module
//!
//! Location-tagged civic problem reports with geospatial duplicate detection
//! and crowd-verified status changes.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use civix_common::config::ServiceAreaConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod models;
pub mod services;

use api::IdentityResolver;
use services::ReportService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
    /// Maps request credentials to owner identities
    pub identity: Arc<dyn IdentityResolver>,
    pub service_area: ServiceAreaConfig,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        service: Arc<ReportService>,
        identity: Arc<dyn IdentityResolver>,
        service_area: ServiceAreaConfig,
    ) -> Self {
        Self {
            service,
            identity,
            service_area,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Mutating report routes and the caller's own listing need an identity;
/// everything else is public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/api/reports", post(api::create_report))
        .route("/api/reports/user/my-reports", get(api::my_reports))
        .route(
            "/api/reports/:id",
            put(api::update_report).delete(api::delete_report),
        )
        .route("/api/reports/:id/status", put(api::update_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::identity_middleware,
        ));

    let public = Router::new()
        .route("/api/reports", get(api::list_reports))
        .route("/api/reports/nearby", get(api::list_nearby))
        .route("/api/reports/:id", get(api::get_report))
        .route("/api/maps/check-boundaries", get(api::check_boundaries))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
