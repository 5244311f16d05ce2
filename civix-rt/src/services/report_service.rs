//! Report service facade
//!
//! The operations offered to the HTTP layer. Wires the record store, the
//! deduplicator and the verification machine together and applies the
//! degraded-mode policies for index faults.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::config::RuntimeSettings;
use crate::error::{ReportError, ReportResult};
use crate::geo::{haversine_distance, GeoIndex, GeoPoint, RTreeGeoIndex};
use crate::models::{Report, ReportDraft, ReportFilter, ReportPatch, ReportStatus, UserId};
use crate::services::address::{AddressResolver, PlaceholderAddressResolver};
use crate::services::deduplicator::Deduplicator;
use crate::services::store::ReportStore;
use crate::services::verification::{VerificationMachine, VerificationPolicy};

/// Report operations
pub struct ReportService {
    store: ReportStore,
    deduplicator: Deduplicator,
    verification: VerificationMachine,
    settings: RuntimeSettings,
    /// Spans duplicate check, insert and index registration
    create_gate: Mutex<()>,
}

impl ReportService {
    /// Service backed by an in-memory R-tree and no address lookup
    pub async fn open(pool: SqlitePool, settings: RuntimeSettings) -> ReportResult<Self> {
        Self::with_collaborators(
            pool,
            settings,
            Arc::new(RTreeGeoIndex::new()),
            Arc::new(PlaceholderAddressResolver),
        )
        .await
    }

    /// Service over caller-supplied index and address resolver
    ///
    /// The index is rebuilt from the database. A failed rebuild leaves the
    /// service running in degraded mode.
    pub async fn with_collaborators(
        pool: SqlitePool,
        settings: RuntimeSettings,
        index: Arc<dyn GeoIndex>,
        address_resolver: Arc<dyn AddressResolver>,
    ) -> ReportResult<Self> {
        let store = ReportStore::new(pool, Arc::clone(&index), address_resolver);

        match store.rebuild_index().await {
            Ok(_) => {}
            Err(ReportError::IndexUnavailable(reason)) => {
                warn!(reason = %reason, "Location index unavailable at startup; running degraded");
            }
            Err(e) => return Err(e),
        }

        Ok(Self {
            store,
            deduplicator: Deduplicator::new(index, settings.duplicate_radius_m),
            verification: VerificationMachine::new(VerificationPolicy::new(
                settings.votes_required,
            )),
            settings,
            create_gate: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Validate, dedup-check and persist a new report
    ///
    /// When the index cannot answer, the report is created without the
    /// duplicate check and a degraded-mode warning is logged.
    pub async fn create_report(&self, draft: ReportDraft, owner: UserId) -> ReportResult<Report> {
        let draft = draft.validate()?;

        let _gate = self.create_gate.lock().await;

        match self
            .deduplicator
            .check_duplicate(&self.store, draft.category, draft.location)
            .await
        {
            Ok(()) => {}
            Err(ReportError::IndexUnavailable(reason)) => {
                warn!(
                    reason = %reason,
                    category = %draft.category,
                    lon = draft.location.lon,
                    lat = draft.location.lat,
                    "Location index unavailable, creating report without duplicate check"
                );
            }
            Err(e) => return Err(e),
        }

        self.store.create(draft, owner).await
    }

    pub async fn get_report(&self, id: Uuid) -> ReportResult<Report> {
        self.store.get(id).await
    }

    pub async fn list_reports(&self, filter: &ReportFilter) -> ReportResult<Vec<Report>> {
        self.store.list_all(filter).await
    }

    /// Reports within `radius_m` of `point`, newest first
    ///
    /// `radius_m` defaults to the configured nearby radius. Falls back to a
    /// full scan when the index is unavailable.
    pub async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_m: Option<f64>,
    ) -> ReportResult<Vec<Report>> {
        point.validate().map_err(ReportError::Validation)?;
        let radius_m = radius_m.unwrap_or(self.settings.nearby_radius_m);
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(ReportError::Validation(format!(
                "radius must be a positive number of meters, got {}",
                radius_m
            )));
        }

        let mut reports = match self.store.index().within(point, radius_m) {
            Ok(neighbors) => {
                let ids: Vec<_> = neighbors.iter().map(|n| n.id).collect();
                self.store.get_many(&ids).await?
            }
            Err(e) => {
                warn!(error = %e, "Location index unavailable, scanning all reports");
                let everything = self
                    .store
                    .list_all(&ReportFilter {
                        valid_coordinates_only: true,
                        ..ReportFilter::default()
                    })
                    .await?;
                everything
                    .into_iter()
                    .filter(|r| haversine_distance(point, r.location) <= radius_m)
                    .collect()
            }
        };

        reports.retain(|r| r.location.is_valid());
        reports.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(reports)
    }

    pub async fn list_by_owner(&self, owner: UserId) -> ReportResult<Vec<Report>> {
        self.store.list_by_owner(owner).await
    }

    pub async fn update_report_content(
        &self,
        id: Uuid,
        patch: ReportPatch,
        actor: UserId,
    ) -> ReportResult<Report> {
        self.store.update(id, patch, actor).await
    }

    /// Request a status change; `target` accepts wire or storage names
    pub async fn update_report_status(
        &self,
        id: Uuid,
        target: &str,
        actor: UserId,
    ) -> ReportResult<Report> {
        let target: ReportStatus = target.parse()?;
        self.verification
            .request_transition(&self.store, id, target, actor)
            .await
    }

    pub async fn delete_report(&self, id: Uuid, actor: UserId) -> ReportResult<()> {
        self.store.delete(id, actor).await
    }

    /// Accept a late address label from the address-resolution collaborator
    pub async fn resolve_address(&self, id: Uuid, label: &str) -> ReportResult<Report> {
        self.store.set_resolved_address(id, label).await
    }

    /// Reload the location index from the database
    ///
    /// Holds the create gate so no report is persisted between the location
    /// snapshot and the index swap.
    pub async fn rebuild_index(&self) -> ReportResult<usize> {
        let _gate = self.create_gate.lock().await;
        self.store.rebuild_index().await
    }
}
