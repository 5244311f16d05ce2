//! Map helper endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ok, ApiResponse};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BoundaryQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct BoundaryResponse {
    pub in_service_area: bool,
}

/// GET /api/maps/check-boundaries?lat=&lng=
///
/// Informational only; report creation is not limited to the service area.
pub async fn check_boundaries(
    State(state): State<AppState>,
    query: Result<Query<BoundaryQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<BoundaryResponse>>> {
    let Query(query) = query?;
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::BadRequest(
            "Latitude and longitude are required".to_string(),
        ));
    };

    Ok(ok(BoundaryResponse {
        in_service_area: state.service_area.contains(lng, lat),
    }))
}
