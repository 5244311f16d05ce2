//! Behavior while the location index cannot answer

use std::sync::Arc;

use civix_common::db::init_database;
use civix_rt::config::RuntimeSettings;
use civix_rt::geo::{GeoIndex, GeoPoint, IndexError, Neighbor};
use civix_rt::models::{ReportDraft, UserId};
use civix_rt::services::{AddressResolver, PlaceholderAddressResolver, ReportService};
use tempfile::TempDir;
use uuid::Uuid;

/// Index whose every call fails
struct BrokenIndex;

impl GeoIndex for BrokenIndex {
    fn insert(&self, _id: Uuid, _point: GeoPoint) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("backend offline".to_string()))
    }

    fn remove(&self, _id: Uuid) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("backend offline".to_string()))
    }

    fn within(&self, _point: GeoPoint, _radius_m: f64) -> Result<Vec<Neighbor>, IndexError> {
        Err(IndexError::Unavailable("backend offline".to_string()))
    }

    fn rebuild(&self, _entries: Vec<(Uuid, GeoPoint)>) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("backend offline".to_string()))
    }

    fn len(&self) -> Result<usize, IndexError> {
        Err(IndexError::Unavailable("backend offline".to_string()))
    }
}

/// Resolver with a fixed answer
struct FixedAddress(&'static str);

impl AddressResolver for FixedAddress {
    fn lookup(&self, _point: GeoPoint) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn draft(location: GeoPoint) -> ReportDraft {
    ReportDraft {
        title: Some("Leaking hydrant".to_string()),
        description: Some("Water pooling on the road".to_string()),
        location_label: Some("Danforth & Pape".to_string()),
        category: Some("infrastructure".to_string()),
        location: Some(location),
        address: None,
        images: vec![],
    }
}

async fn degraded_service(dir: &TempDir) -> ReportService {
    let pool = init_database(&dir.path().join("civix.db")).await.unwrap();
    ReportService::with_collaborators(
        pool,
        RuntimeSettings::default(),
        Arc::new(BrokenIndex),
        Arc::new(PlaceholderAddressResolver),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_create_proceeds_without_dedup() {
    let dir = TempDir::new().unwrap();
    let service = degraded_service(&dir).await;
    let point = GeoPoint::new(-79.3447, 43.6786);

    service
        .create_report(draft(point), UserId::new_random())
        .await
        .unwrap();
    // Same spot and category, admitted because the duplicate check is skipped
    service
        .create_report(draft(point), UserId::new_random())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nearby_falls_back_to_scan() {
    let dir = TempDir::new().unwrap();
    let service = degraded_service(&dir).await;
    let center = GeoPoint::new(-79.3447, 43.6786);

    let close = service
        .create_report(draft(center), UserId::new_random())
        .await
        .unwrap();
    service
        .create_report(draft(GeoPoint::new(-79.5, 43.75)), UserId::new_random())
        .await
        .unwrap();

    let nearby = service.list_nearby(center, Some(500.0)).await.unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].id, close.id);
}

#[tokio::test]
async fn test_delete_succeeds_when_index_remove_fails() {
    let dir = TempDir::new().unwrap();
    let service = degraded_service(&dir).await;
    let owner = UserId::new_random();

    let report = service
        .create_report(draft(GeoPoint::new(-79.3447, 43.6786)), owner)
        .await
        .unwrap();
    service.delete_report(report.id, owner).await.unwrap();
    assert!(service.get_report(report.id).await.is_err());
}

#[tokio::test]
async fn test_address_resolver_used_at_create() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("civix.db")).await.unwrap();
    let service = ReportService::with_collaborators(
        pool,
        RuntimeSettings::default(),
        Arc::new(civix_rt::geo::RTreeGeoIndex::new()),
        Arc::new(FixedAddress("1 Yonge St, Toronto")),
    )
    .await
    .unwrap();

    let report = service
        .create_report(draft(GeoPoint::new(-79.3733, 43.6426)), UserId::new_random())
        .await
        .unwrap();
    assert_eq!(report.address.as_deref(), Some("1 Yonge St, Toronto"));
}
