//! Integration tests for database initialization
//!
//! Covers:
//! - Automatic database creation with the default schema
//! - Idempotent re-open of an existing database
//! - Default runtime settings, including repair of NULL values
//! - Coordinate range checks enforced by the schema

use civix_common::db::init::init_database;
use civix_common::db::{get_setting, migrations::get_schema_version, set_setting};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("civix.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("civix.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("civix.db")).await.unwrap();

    assert_eq!(get_setting(&pool, "duplicate_radius_m").await.unwrap().as_deref(), Some("5.0"));
    assert_eq!(get_setting(&pool, "nearby_radius_m").await.unwrap().as_deref(), Some("1000.0"));
    assert_eq!(get_setting(&pool, "votes_required").await.unwrap().as_deref(), Some("2"));
    assert_eq!(get_setting(&pool, "no_such_key").await.unwrap(), None);
}

#[tokio::test]
async fn test_custom_settings_survive_reinit() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("civix.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, "duplicate_radius_m", "12.5").await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_setting(&pool, "duplicate_radius_m").await.unwrap().as_deref(), Some("12.5"));
}

#[tokio::test]
async fn test_null_setting_reset_to_default() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("civix.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'votes_required'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_setting(&pool, "votes_required").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_migrations_recorded() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("civix.db")).await.unwrap();

    assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_schema_rejects_out_of_range_coordinates() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("civix.db")).await.unwrap();

    let result = sqlx::query(
        r#"
        INSERT INTO reports (id, title, description, location_label, category, category_label,
                             longitude, latitude, owner_id, created_at, updated_at)
        VALUES ('r1', 'Pothole', 'Deep', 'Queen St', 'infrastructure', 'Infrastructure',
                200.0, 43.0, 'u1', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')
        "#,
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Longitude 200 must violate the schema check");
}
