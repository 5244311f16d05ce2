//! Error types for civix-rt
//!
//! `ReportError` is the typed result of every core operation. `ApiError` is its
//! HTTP rendering; handlers return `ApiResult<T>` and convert with `?`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::geo::IndexError;
use crate::models::Category;

/// Core error taxonomy
#[derive(Debug, Error)]
pub enum ReportError {
    /// Malformed or missing input, never retried
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An active report of the same category already covers this location
    #[error("This {category} issue has already been reported at this location (report {existing})")]
    DuplicateConflict { existing: Uuid, category: Category },

    /// Acting identity may not perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    /// Unrecognized status transition target
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Geospatial index cannot answer queries right now
    #[error("Geospatial index unavailable: {0}")]
    IndexUnavailable(String),

    /// Underlying persistence failure
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A stored row could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<civix_common::Error> for ReportError {
    fn from(err: civix_common::Error) -> Self {
        match err {
            civix_common::Error::Database(e) => ReportError::Store(e),
            other => ReportError::Corrupt(other.to_string()),
        }
    }
}

impl From<IndexError> for ReportError {
    fn from(err: IndexError) -> Self {
        ReportError::IndexUnavailable(err.to_string())
    }
}

/// Result type for core operations
pub type ReportResult<T> = Result<T, ReportError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or unusable credential (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate report (409)
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        existing_report_id: Uuid,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(_) | ReportError::InvalidStatus(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ReportError::DuplicateConflict { existing, .. } => ApiError::Conflict {
                message: err.to_string(),
                existing_report_id: existing,
            },
            ReportError::Forbidden(msg) => ApiError::Forbidden(msg),
            ReportError::NotFound(id) => ApiError::NotFound(format!("Report {}", id)),
            ReportError::IndexUnavailable(_) | ReportError::Store(_) | ReportError::Corrupt(_) => {
                tracing::error!(error = %err, "Report operation failed");
                ApiError::Internal("Server Error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, existing) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            ApiError::Conflict {
                message,
                existing_report_id,
            } => (
                StatusCode::CONFLICT,
                "DUPLICATE_REPORT",
                message,
                Some(existing_report_id),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(id) = existing {
            error["existing_report_id"] = json!(id);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
