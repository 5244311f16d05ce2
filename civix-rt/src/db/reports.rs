//! Report persistence
//!
//! Plain SQL over the `reports` table. No business rules live here: callers
//! validate, authorize and serialize before reaching these functions.

use chrono::{DateTime, Utc};
use civix_common::time::{from_db_string, to_db_string};
use civix_common::uuid_utils::parse_stored;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};
use crate::geo::GeoPoint;
use crate::models::{Category, Report, ReportFilter, ReportStatus, UserId};

const REPORT_COLUMNS: &str = "id, title, description, location_label, category, category_label, \
     longitude, latitude, address, status, verification_count, owner_id, images, \
     created_at, updated_at";

/// Bound parameters per `IN (...)` query, well under SQLite's variable limit
const ID_BATCH_SIZE: usize = 500;

/// Insert a new report row
pub async fn insert_report(pool: &SqlitePool, report: &Report) -> ReportResult<()> {
    let images = serde_json::to_string(&report.images)
        .map_err(|e| ReportError::Corrupt(format!("Failed to encode images: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO reports (id, title, description, location_label, category, category_label,
                             longitude, latitude, address, status, verification_count, owner_id,
                             images, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.id.to_string())
    .bind(&report.title)
    .bind(&report.description)
    .bind(&report.location_label)
    .bind(report.category.as_str())
    .bind(&report.category_label)
    .bind(report.location.lon)
    .bind(report.location.lat)
    .bind(&report.address)
    .bind(report.status.as_db_str())
    .bind(i64::from(report.verification_count))
    .bind(report.owner_id.to_string())
    .bind(images)
    .bind(to_db_string(&report.created_at))
    .bind(to_db_string(&report.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one report
pub async fn load_report(pool: &SqlitePool, id: Uuid) -> ReportResult<Option<Report>> {
    let sql = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(report_from_row).transpose()
}

/// Load several reports by id in one pass
///
/// Ids with no row are skipped. Result order follows the database, not `ids`.
pub async fn load_reports(pool: &SqlitePool, ids: &[Uuid]) -> ReportResult<Vec<Report>> {
    let mut reports = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(ID_BATCH_SIZE) {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM reports WHERE id IN (", REPORT_COLUMNS));
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        for row in &query.build().fetch_all(pool).await? {
            reports.push(report_from_row(row)?);
        }
    }

    Ok(reports)
}

/// Load reports matching a filter, newest first
pub async fn list_reports(pool: &SqlitePool, filter: &ReportFilter) -> ReportResult<Vec<Report>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM reports WHERE 1 = 1", REPORT_COLUMNS));

    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_db_str());
    }
    if let Some(owner) = filter.owner_id {
        query.push(" AND owner_id = ").push_bind(owner.to_string());
    }
    query.push(" ORDER BY created_at DESC, id DESC");

    let rows = query.build().fetch_all(pool).await?;

    let mut reports = Vec::with_capacity(rows.len());
    for row in &rows {
        let report = report_from_row(row)?;
        if filter.matches(&report) {
            reports.push(report);
        }
    }
    Ok(reports)
}

/// Every stored (id, point) pair, for rebuilding the location index
pub async fn load_locations(pool: &SqlitePool) -> ReportResult<Vec<(Uuid, GeoPoint)>> {
    let rows = sqlx::query("SELECT id, longitude, latitude FROM reports")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> ReportResult<(Uuid, GeoPoint)> {
            let id: String = row.try_get("id")?;
            let point = GeoPoint::new(row.try_get("longitude")?, row.try_get("latitude")?);
            Ok((parse_stored("id", &id)?, point))
        })
        .collect()
}

/// Persist editable content fields
pub async fn update_content(pool: &SqlitePool, report: &Report) -> ReportResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reports
        SET title = ?, description = ?, location_label = ?, category = ?, category_label = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&report.title)
    .bind(&report.description)
    .bind(&report.location_label)
    .bind(report.category.as_str())
    .bind(&report.category_label)
    .bind(to_db_string(&report.updated_at))
    .bind(report.id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Write status and verification count
///
/// Only applies when the row still holds the status and count the caller read,
/// so a writer outside this process cannot be silently overwritten. Returns
/// the number of rows changed (0 or 1).
pub async fn update_verification(
    pool: &SqlitePool,
    id: Uuid,
    expected: (ReportStatus, u32),
    new_status: ReportStatus,
    new_count: u32,
    updated_at: DateTime<Utc>,
) -> ReportResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reports
        SET status = ?, verification_count = ?, updated_at = ?
        WHERE id = ? AND status = ? AND verification_count = ?
        "#,
    )
    .bind(new_status.as_db_str())
    .bind(i64::from(new_count))
    .bind(to_db_string(&updated_at))
    .bind(id.to_string())
    .bind(expected.0.as_db_str())
    .bind(i64::from(expected.1))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Store the resolved address label
pub async fn update_address(
    pool: &SqlitePool,
    id: Uuid,
    address: &str,
    updated_at: DateTime<Utc>,
) -> ReportResult<u64> {
    let result = sqlx::query("UPDATE reports SET address = ?, updated_at = ? WHERE id = ?")
        .bind(address)
        .bind(to_db_string(&updated_at))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Remove a report row
pub async fn delete_report(pool: &SqlitePool, id: Uuid) -> ReportResult<u64> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Count stored reports
pub async fn count_reports(pool: &SqlitePool) -> ReportResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn report_from_row(row: &SqliteRow) -> ReportResult<Report> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let owner: String = row.try_get("owner_id")?;
    let images: String = row.try_get("images")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let verification_count: i64 = row.try_get("verification_count")?;

    let category = category.parse::<Category>().map_err(|_| {
        ReportError::Corrupt(format!("Unknown category '{}' in report {}", category, id))
    })?;
    let status = status.parse::<ReportStatus>().map_err(|_| {
        ReportError::Corrupt(format!("Unknown status '{}' in report {}", status, id))
    })?;
    let images: Vec<String> = serde_json::from_str(&images)
        .map_err(|e| ReportError::Corrupt(format!("Invalid images in report {}: {}", id, e)))?;
    let verification_count = u32::try_from(verification_count).map_err(|_| {
        ReportError::Corrupt(format!(
            "Invalid verification count {} in report {}",
            verification_count, id
        ))
    })?;

    Ok(Report {
        id: parse_stored("id", &id)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        location_label: row.try_get("location_label")?,
        category,
        category_label: row.try_get("category_label")?,
        location: GeoPoint::new(row.try_get("longitude")?, row.try_get("latitude")?),
        address: row.try_get("address")?,
        status,
        verification_count,
        owner_id: UserId(parse_stored("owner_id", &owner)?),
        images,
        created_at: from_db_string(&created_at)?,
        updated_at: from_db_string(&updated_at)?,
    })
}
