//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies pragmas, creates the schema,
//! runs migrations and writes default settings. Safe to call on every start.

use crate::db::settings::ensure_setting;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default radius, in meters, inside which two same-category reports are duplicates
pub const DEFAULT_DUPLICATE_RADIUS_M: &str = "5.0";
/// Default radius, in meters, for nearby listings
pub const DEFAULT_NEARBY_RADIUS_M: &str = "1000.0";
/// Default number of non-owner votes that force a status change
pub const DEFAULT_VOTES_REQUIRED: &str = "2";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets readers proceed while a single writer commits
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_reports_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the reports table
///
/// Coordinate range checks back up the validation done before insert, so a row
/// without a usable point cannot be written even by a direct SQL client.
pub async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK (length(trim(title)) > 0),
            description TEXT NOT NULL CHECK (length(trim(description)) > 0),
            location_label TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('infrastructure', 'cleanliness', 'human')),
            category_label TEXT NOT NULL,
            longitude REAL NOT NULL CHECK (longitude BETWEEN -180.0 AND 180.0),
            latitude REAL NOT NULL CHECK (latitude BETWEEN -90.0 AND 90.0),
            address TEXT,
            status TEXT NOT NULL DEFAULT 'flagged'
                CHECK (status IN ('flagged', 'verified', 'in_progress', 'solved')),
            verification_count INTEGER NOT NULL DEFAULT 0 CHECK (verification_count >= 0),
            owner_id TEXT NOT NULL,
            images TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or repair default settings
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "duplicate_radius_m", DEFAULT_DUPLICATE_RADIUS_M).await?;
    ensure_setting(pool, "nearby_radius_m", DEFAULT_NEARBY_RADIUS_M).await?;
    ensure_setting(pool, "votes_required", DEFAULT_VOTES_REQUIRED).await?;

    Ok(())
}
