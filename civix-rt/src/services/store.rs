//! Record store
//!
//! Authoritative CRUD over reports. Owns the SQLite pool, keeps the location
//! index in step with persisted rows and serializes writes per report.
//!
//! Locks are always taken before any database connection is acquired, and
//! every write is a single autocommit statement.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use civix_common::{time, uuid_utils};
use sqlx::SqlitePool;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::reports as db;
use crate::error::{ReportError, ReportResult};
use crate::geo::GeoIndex;
use crate::models::{
    Report, ReportFilter, ReportPatch, ReportStatus, UserId, ValidDraft, ADDRESS_PLACEHOLDER,
};
use crate::services::access::{AccessGuard, Operation};
use crate::services::address::AddressResolver;
use crate::services::locks::RecordLocks;

/// Report persistence plus index maintenance
pub struct ReportStore {
    db: SqlitePool,
    index: Arc<dyn GeoIndex>,
    guard: AccessGuard,
    locks: RecordLocks,
    address_resolver: Arc<dyn AddressResolver>,
}

impl ReportStore {
    pub fn new(
        db: SqlitePool,
        index: Arc<dyn GeoIndex>,
        address_resolver: Arc<dyn AddressResolver>,
    ) -> Self {
        Self {
            db,
            index,
            guard: AccessGuard::new(),
            locks: RecordLocks::new(),
            address_resolver,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub fn index(&self) -> &Arc<dyn GeoIndex> {
        &self.index
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Reload the location index from persisted rows
    ///
    /// Caller must exclude concurrent creates for the duration.
    pub(crate) async fn rebuild_index(&self) -> ReportResult<usize> {
        let entries = db::load_locations(&self.db).await?;
        let count = entries.len();
        self.index.rebuild(entries)?;
        info!(reports = count, "Location index rebuilt");
        Ok(count)
    }

    /// Persist a validated draft as a new `Flagged` report
    ///
    /// The caller is responsible for duplicate clearance. An index failure
    /// after the row is written is logged; the row stays authoritative and the
    /// next rebuild picks it up.
    pub async fn create(&self, draft: ValidDraft, owner: UserId) -> ReportResult<Report> {
        let now = time::now();
        let address = draft
            .address
            .or_else(|| self.address_resolver.lookup(draft.location))
            .unwrap_or_else(|| ADDRESS_PLACEHOLDER.to_string());

        let report = Report {
            id: uuid_utils::generate(),
            title: draft.title,
            description: draft.description,
            location_label: draft.location_label,
            category: draft.category,
            category_label: draft.category.label().to_string(),
            location: draft.location,
            address: Some(address),
            status: ReportStatus::Flagged,
            verification_count: 0,
            owner_id: owner,
            images: draft.images,
            created_at: now,
            updated_at: now,
        };

        db::insert_report(&self.db, &report).await?;

        if let Err(e) = self.index.insert(report.id, report.location) {
            warn!(report_id = %report.id, error = %e, "Report stored but not indexed");
        }

        info!(
            report_id = %report.id,
            owner = %owner,
            category = %report.category,
            "Report created"
        );
        Ok(report)
    }

    pub async fn get(&self, id: Uuid) -> ReportResult<Report> {
        db::load_report(&self.db, id)
            .await?
            .ok_or(ReportError::NotFound(id))
    }

    /// Load the reports that still exist among `ids`
    pub async fn get_many(&self, ids: &[Uuid]) -> ReportResult<Vec<Report>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        db::load_reports(&self.db, ids).await
    }

    /// Reports matching `filter`, newest first
    pub async fn list_all(&self, filter: &ReportFilter) -> ReportResult<Vec<Report>> {
        db::list_reports(&self.db, filter).await
    }

    pub async fn list_by_owner(&self, owner: UserId) -> ReportResult<Vec<Report>> {
        self.list_all(&ReportFilter::by_owner(owner)).await
    }

    pub async fn count(&self) -> ReportResult<i64> {
        db::count_reports(&self.db).await
    }

    /// Apply the caller-editable fields of `patch`
    ///
    /// An empty patch returns the report unchanged.
    pub async fn update(&self, id: Uuid, patch: ReportPatch, actor: UserId) -> ReportResult<Report> {
        let patch = patch.validate()?;

        let _lock = self.locks.acquire(id).await;
        let mut report = self.get(id).await?;
        self.guard.authorize(&report, &actor, Operation::UpdateContent)?;

        if patch.is_empty() {
            return Ok(report);
        }

        patch.apply_to(&mut report);
        report.updated_at = next_modification_time(report.updated_at);

        if db::update_content(&self.db, &report).await? == 0 {
            return Err(ReportError::NotFound(id));
        }

        info!(report_id = %id, "Report content updated");
        Ok(report)
    }

    /// Permanently remove a report from the store and the index
    pub async fn delete(&self, id: Uuid, actor: UserId) -> ReportResult<()> {
        let lock = self.locks.acquire(id).await;
        let report = self.get(id).await?;
        self.guard.authorize(&report, &actor, Operation::Delete)?;

        if db::delete_report(&self.db, id).await? == 0 {
            return Err(ReportError::NotFound(id));
        }

        if let Err(e) = self.index.remove(id) {
            warn!(report_id = %id, error = %e, "Deleted report left in location index");
        }

        drop(lock);
        self.locks.prune();

        info!(report_id = %id, "Report deleted");
        Ok(())
    }

    /// Record an address label supplied after creation
    pub async fn set_resolved_address(&self, id: Uuid, label: &str) -> ReportResult<Report> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ReportError::Validation("address is required".to_string()));
        }

        let _lock = self.locks.acquire(id).await;
        let mut report = self.get(id).await?;
        report.address = Some(label.to_string());
        report.updated_at = next_modification_time(report.updated_at);

        if db::update_address(&self.db, id, label, report.updated_at).await? == 0 {
            return Err(ReportError::NotFound(id));
        }

        debug!(report_id = %id, "Address resolved");
        Ok(report)
    }

    /// Hold the write lock for one report
    pub(crate) async fn lock_record(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.acquire(id).await
    }

    /// Persist a status/count change decided by the verification machine
    ///
    /// Caller must hold the record lock and pass the report as it read it.
    pub(crate) async fn write_verification(
        &self,
        current: &Report,
        status: ReportStatus,
        verification_count: u32,
    ) -> ReportResult<Report> {
        let updated_at = next_modification_time(current.updated_at);

        let changed = db::update_verification(
            &self.db,
            current.id,
            (current.status, current.verification_count),
            status,
            verification_count,
            updated_at,
        )
        .await?;

        if changed == 0 {
            // Row deleted, or modified by a writer outside this process.
            return match db::load_report(&self.db, current.id).await? {
                None => Err(ReportError::NotFound(current.id)),
                Some(_) => Err(ReportError::Corrupt(format!(
                    "Report {} changed outside the verification machine",
                    current.id
                ))),
            };
        }

        Ok(Report {
            status,
            verification_count,
            updated_at,
            ..current.clone()
        })
    }
}

/// Modification timestamp strictly after `previous`
fn next_modification_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = time::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modification_time_always_advances() {
        let future = Utc::now() + Duration::hours(1);
        let next = next_modification_time(future);
        assert!(next > future);

        let past = Utc::now() - Duration::hours(1);
        assert!(next_modification_time(past) > past);
    }
}
