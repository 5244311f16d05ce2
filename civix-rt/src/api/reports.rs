//! Report endpoints
//!
//! Thin adapters over [`ReportService`](crate::services::ReportService): parse
//! the request, call one operation, wrap the result in the response envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::ActingIdentity;
use super::{ok, ApiResponse};
use crate::error::{ApiError, ApiResult, ReportError};
use crate::geo::GeoPoint;
use crate::models::{Category, Report, ReportDraft, ReportFilter, ReportPatch, ReportStatus};
use crate::AppState;

/// Listing filters; blank values are ignored
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

/// Nearby query; numbers arrive as text so bad input gets a JSON error
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub lng: Option<String>,
    pub lat: Option<String>,
    pub radius: Option<String>,
}

/// Body of a status change request
#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Body returned by a successful delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/reports
pub async fn create_report(
    State(state): State<AppState>,
    Extension(ActingIdentity(owner)): Extension<ActingIdentity>,
    body: Result<Json<ReportDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Report>>)> {
    let Json(draft) = body?;
    let report = state.service.create_report(draft, owner).await?;
    Ok((StatusCode::CREATED, ok(report)))
}

/// GET /api/reports
pub async fn list_reports(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<Report>>>> {
    let Query(query) = query?;
    let filter = ReportFilter {
        category: non_blank(query.category.as_deref())
            .map(str::parse::<Category>)
            .transpose()?,
        status: non_blank(query.status.as_deref())
            .map(str::parse::<ReportStatus>)
            .transpose()?,
        ..ReportFilter::default()
    };

    let reports = state.service.list_reports(&filter).await?;
    Ok(ok(reports))
}

/// GET /api/reports/nearby?lng=&lat=&radius=
pub async fn list_nearby(
    State(state): State<AppState>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<Report>>>> {
    let Query(query) = query?;
    let (Some(lng), Some(lat)) = (
        non_blank(query.lng.as_deref()),
        non_blank(query.lat.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "Latitude and longitude are required".to_string(),
        ));
    };

    let point = GeoPoint::new(parse_number("lng", lng)?, parse_number("lat", lat)?);
    let radius = non_blank(query.radius.as_deref())
        .map(|r| parse_number("radius", r))
        .transpose()?;

    let reports = state.service.list_nearby(point, radius).await?;
    Ok(ok(reports))
}

/// GET /api/reports/user/my-reports
pub async fn my_reports(
    State(state): State<AppState>,
    Extension(ActingIdentity(owner)): Extension<ActingIdentity>,
) -> ApiResult<Json<ApiResponse<Vec<Report>>>> {
    let reports = state.service.list_by_owner(owner).await?;
    Ok(ok(reports))
}

/// GET /api/reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Report>>> {
    let report = state.service.get_report(parse_id(&id)?).await?;
    Ok(ok(report))
}

/// PUT /api/reports/:id
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(ActingIdentity(actor)): Extension<ActingIdentity>,
    body: Result<Json<ReportPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Report>>> {
    let Json(patch) = body?;
    let report = state
        .service
        .update_report_content(parse_id(&id)?, patch, actor)
        .await?;
    Ok(ok(report))
}

/// PUT /api/reports/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(ActingIdentity(actor)): Extension<ActingIdentity>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Report>>> {
    let Json(request) = body?;
    let id = parse_id(&id)?;
    let target = request.status.unwrap_or_default();
    let report = state.service.update_report_status(id, &target, actor).await?;
    Ok(ok(report))
}

/// DELETE /api/reports/:id
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(ActingIdentity(actor)): Extension<ActingIdentity>,
) -> ApiResult<Json<DeleteResponse>> {
    state.service.delete_report(parse_id(&id)?, actor).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "Report deleted".to_string(),
    }))
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::NotFound(format!("Invalid report ID: {}", raw)))
}

fn parse_number(field: &str, raw: &str) -> Result<f64, ReportError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ReportError::Validation(format!("{} must be a number, got '{}'", field, raw)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
