//! Geospatial duplicate detection for new reports
//!
//! A proposed report duplicates an existing one when an unsolved report of the
//! same category lies within the duplicate radius of its point.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ReportError, ReportResult};
use crate::geo::{GeoIndex, GeoPoint};
use crate::models::Category;
use crate::services::store::ReportStore;

/// Duplicate check against the location index
pub struct Deduplicator {
    index: Arc<dyn GeoIndex>,
    radius_m: f64,
}

impl Deduplicator {
    pub fn new(index: Arc<dyn GeoIndex>, radius_m: f64) -> Self {
        Self { index, radius_m }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Clear or reject a proposed report
    ///
    /// # Errors
    ///
    /// - `DuplicateConflict` naming the nearest active same-category report
    /// - `IndexUnavailable` when the index cannot answer; the caller picks the
    ///   fallback
    pub async fn check_duplicate(
        &self,
        store: &ReportStore,
        category: Category,
        point: GeoPoint,
    ) -> ReportResult<()> {
        let neighbors = self.index.within(point, self.radius_m)?;
        if neighbors.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = neighbors.iter().map(|n| n.id).collect();
        let mut candidates: HashMap<_, _> = store
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|report| (report.id, report))
            .collect();

        // Neighbors are nearest first; the first live match is reported.
        for neighbor in &neighbors {
            let Some(report) = candidates.remove(&neighbor.id) else {
                continue;
            };
            if report.is_active() && report.category == category {
                debug!(
                    existing = %report.id,
                    distance_m = neighbor.distance_m,
                    category = %category,
                    "Duplicate report rejected"
                );
                return Err(ReportError::DuplicateConflict {
                    existing: report.id,
                    category,
                });
            }
        }

        Ok(())
    }
}
