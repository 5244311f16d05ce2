//! # Geospatial Index
//!
//! Keeps report locations in an in-memory R-tree (`rstar`) and answers
//! "which reports lie within R meters of P" queries.
//!
//! The tree stores raw (lon, lat) degrees. A radius query first collects
//! candidates from one or two degree envelopes that are guaranteed to contain
//! the spherical cap, then keeps only those whose haversine distance is within
//! the radius. Envelopes are split at the antimeridian and widened to the full
//! longitude range near the poles.
//!
//! The index is derived state: the record store is authoritative and the index
//! is rebuilt from it on startup.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::RwLock;

use rstar::{RTree, RTreeObject, AABB};
use thiserror::Error;
use uuid::Uuid;

use super::{haversine_distance, GeoPoint, EARTH_MEAN_RADIUS_M};

/// Widening applied to query envelopes so float rounding never drops a point
/// sitting exactly on the radius. The haversine filter removes the extras.
const ENVELOPE_MARGIN: f64 = 1.01;

/// Index failure
#[derive(Debug, Error)]
pub enum IndexError {
    /// A writer panicked while holding the index lock
    #[error("index lock poisoned")]
    Poisoned,

    /// Index cannot serve queries (not loaded, backend down, ...)
    #[error("{0}")]
    Unavailable(String),
}

/// A report id matched by a radius query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: Uuid,
    pub distance_m: f64,
}

/// Location index over report identifiers
///
/// Implementations must be safe to share across request tasks.
pub trait GeoIndex: Send + Sync {
    /// Add or replace the point stored for `id`
    fn insert(&self, id: Uuid, point: GeoPoint) -> Result<(), IndexError>;

    /// Forget `id`; no-op when absent
    fn remove(&self, id: Uuid) -> Result<(), IndexError>;

    /// Ids within `radius_m` meters of `point`, nearest first (ties by id)
    fn within(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<Neighbor>, IndexError>;

    /// Replace the whole index content
    fn rebuild(&self, entries: Vec<(Uuid, GeoPoint)>) -> Result<(), IndexError>;

    /// Number of indexed ids
    fn len(&self) -> Result<usize, IndexError>;

    fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }
}

/// R-tree entry
#[derive(Debug, Clone, PartialEq)]
struct IndexedReport {
    id: Uuid,
    position: [f64; 2],
}

impl IndexedReport {
    fn new(id: Uuid, point: GeoPoint) -> Self {
        Self {
            id,
            position: [point.lon, point.lat],
        }
    }

    fn point(&self) -> GeoPoint {
        GeoPoint::new(self.position[0], self.position[1])
    }
}

impl RTreeObject for IndexedReport {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

#[derive(Default)]
struct IndexState {
    tree: RTree<IndexedReport>,
    /// id → stored point, for idempotent insert and removal
    positions: HashMap<Uuid, GeoPoint>,
}

/// In-memory R-tree implementation of [`GeoIndex`]
#[derive(Default)]
pub struct RTreeGeoIndex {
    state: RwLock<IndexState>,
}

impl RTreeGeoIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeoIndex for RTreeGeoIndex {
    fn insert(&self, id: Uuid, point: GeoPoint) -> Result<(), IndexError> {
        let mut state = self.state.write().map_err(|_| IndexError::Poisoned)?;

        if let Some(existing) = state.positions.get(&id).copied() {
            if existing == point {
                return Ok(());
            }
            state.tree.remove(&IndexedReport::new(id, existing));
        }

        state.tree.insert(IndexedReport::new(id, point));
        state.positions.insert(id, point);
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<(), IndexError> {
        let mut state = self.state.write().map_err(|_| IndexError::Poisoned)?;

        if let Some(point) = state.positions.remove(&id) {
            state.tree.remove(&IndexedReport::new(id, point));
        }
        Ok(())
    }

    fn within(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<Neighbor>, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;

        if !radius_m.is_finite() || radius_m < 0.0 || !point.is_valid() {
            return Ok(Vec::new());
        }

        let mut found: Vec<Neighbor> = search_envelopes(point, radius_m)
            .iter()
            .flat_map(|envelope| state.tree.locate_in_envelope(envelope))
            .filter_map(|entry| {
                let distance_m = haversine_distance(point, entry.point());
                (distance_m <= radius_m).then_some(Neighbor {
                    id: entry.id,
                    distance_m,
                })
            })
            .collect();

        found.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    fn rebuild(&self, entries: Vec<(Uuid, GeoPoint)>) -> Result<(), IndexError> {
        let mut positions = HashMap::with_capacity(entries.len());
        for (id, point) in entries {
            positions.insert(id, point);
        }
        let items = positions
            .iter()
            .map(|(id, point)| IndexedReport::new(*id, *point))
            .collect();

        let mut state = self.state.write().map_err(|_| IndexError::Poisoned)?;
        state.tree = RTree::bulk_load(items);
        state.positions = positions;
        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;
        Ok(state.positions.len())
    }
}

/// Degree envelopes covering every point within `radius_m` of `center`
fn search_envelopes(center: GeoPoint, radius_m: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = radius_m / EARTH_MEAN_RADIUS_M;
    let dlat = angular.to_degrees() * ENVELOPE_MARGIN;
    let min_lat = (center.lat - dlat).max(-90.0);
    let max_lat = (center.lat + dlat).min(90.0);

    let full_band = || vec![AABB::from_corners([-180.0, min_lat], [180.0, max_lat])];

    // Cap reaches a pole, or covers a whole hemisphere
    if center.lat - dlat <= -90.0 || center.lat + dlat >= 90.0 || angular >= FRAC_PI_2 {
        return full_band();
    }

    let ratio = angular.sin() / center.lat.to_radians().cos();
    if ratio >= 1.0 {
        return full_band();
    }
    let dlon = ratio.asin().to_degrees() * ENVELOPE_MARGIN;
    if dlon >= 180.0 {
        return full_band();
    }

    let min_lon = center.lon - dlon;
    let max_lon = center.lon + dlon;

    if min_lon < -180.0 {
        vec![
            AABB::from_corners([min_lon + 360.0, min_lat], [180.0, max_lat]),
            AABB::from_corners([-180.0, min_lat], [max_lon, max_lat]),
        ]
    } else if max_lon > 180.0 {
        vec![
            AABB::from_corners([min_lon, min_lat], [180.0, max_lat]),
            AABB::from_corners([-180.0, min_lat], [max_lon - 360.0, max_lat]),
        ]
    } else {
        vec![AABB::from_corners([min_lon, min_lat], [max_lon, max_lat])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METERS_PER_DEGREE: f64 = EARTH_MEAN_RADIUS_M * std::f64::consts::PI / 180.0;

    fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.lon, p.lat + meters / METERS_PER_DEGREE)
    }

    fn ids(neighbors: &[Neighbor]) -> Vec<Uuid> {
        neighbors.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_within_orders_by_distance() {
        let index = RTreeGeoIndex::new();
        let origin = GeoPoint::new(-79.3832, 43.6532);
        let (near, mid, far) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        index.insert(far, north_of(origin, 900.0)).unwrap();
        index.insert(near, north_of(origin, 10.0)).unwrap();
        index.insert(mid, north_of(origin, 300.0)).unwrap();
        index.insert(Uuid::new_v4(), north_of(origin, 5_000.0)).unwrap();

        let found = index.within(origin, 1_000.0).unwrap();
        assert_eq!(ids(&found), vec![near, mid, far]);
        assert!((found[0].distance_m - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_within_is_repeatable() {
        let index = RTreeGeoIndex::new();
        let origin = GeoPoint::new(2.3522, 48.8566);
        for i in 0..20 {
            index.insert(Uuid::new_v4(), north_of(origin, i as f64 * 3.0)).unwrap();
        }

        let first = index.within(origin, 40.0).unwrap();
        let second = index.within(origin, 40.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 14);
    }

    #[test]
    fn test_insert_is_idempotent_and_replaces_point() {
        let index = RTreeGeoIndex::new();
        let id = Uuid::new_v4();
        let a = GeoPoint::new(10.0, 10.0);
        let b = GeoPoint::new(20.0, 20.0);

        index.insert(id, a).unwrap();
        index.insert(id, a).unwrap();
        assert_eq!(index.len().unwrap(), 1);

        index.insert(id, b).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        assert!(index.within(a, 10.0).unwrap().is_empty());
        assert_eq!(ids(&index.within(b, 10.0).unwrap()), vec![id]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let index = RTreeGeoIndex::new();
        index.remove(Uuid::new_v4()).unwrap();

        let id = Uuid::new_v4();
        let p = GeoPoint::new(0.0, 0.0);
        index.insert(id, p).unwrap();
        index.remove(id).unwrap();
        index.remove(id).unwrap();
        assert!(index.is_empty().unwrap());
        assert!(index.within(p, 100.0).unwrap().is_empty());
    }

    #[test]
    fn test_radius_boundary_uses_great_circle_distance() {
        let index = RTreeGeoIndex::new();
        let origin = GeoPoint::new(-79.3832, 43.6532);
        let at_3m = Uuid::new_v4();
        let at_10m = Uuid::new_v4();
        index.insert(at_3m, north_of(origin, 3.0)).unwrap();
        index.insert(at_10m, north_of(origin, 10.0)).unwrap();

        assert_eq!(ids(&index.within(origin, 5.0).unwrap()), vec![at_3m]);
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        // At 60N one degree of longitude is about half a degree of latitude
        let index = RTreeGeoIndex::new();
        let origin = GeoPoint::new(10.0, 60.0);
        let east = Uuid::new_v4();
        index.insert(east, GeoPoint::new(10.001, 60.0)).unwrap();

        let found = index.within(origin, 60.0).unwrap();
        assert_eq!(ids(&found), vec![east]);
        assert!((found[0].distance_m - 55.6).abs() < 0.5);
    }

    #[test]
    fn test_query_across_antimeridian() {
        let index = RTreeGeoIndex::new();
        let west_side = Uuid::new_v4();
        let east_side = Uuid::new_v4();
        index.insert(west_side, GeoPoint::new(-179.9999, 0.0)).unwrap();
        index.insert(east_side, GeoPoint::new(179.9999, 0.0)).unwrap();

        let from_east = index.within(GeoPoint::new(179.99995, 0.0), 50.0).unwrap();
        assert_eq!(from_east.len(), 2);

        let from_west = index.within(GeoPoint::new(-180.0, 0.0), 50.0).unwrap();
        assert_eq!(from_west.len(), 2);
    }

    #[test]
    fn test_query_near_pole_spans_all_longitudes() {
        let index = RTreeGeoIndex::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        index.insert(a, GeoPoint::new(0.0, 89.9999)).unwrap();
        index.insert(b, GeoPoint::new(180.0, 89.9999)).unwrap();

        let found = index.within(GeoPoint::new(90.0, 90.0), 20.0).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_rebuild_replaces_content() {
        let index = RTreeGeoIndex::new();
        let stale = Uuid::new_v4();
        index.insert(stale, GeoPoint::new(1.0, 1.0)).unwrap();

        let fresh: Vec<(Uuid, GeoPoint)> = (0..50)
            .map(|i| (Uuid::new_v4(), GeoPoint::new(i as f64 * 0.001, 0.0)))
            .collect();
        index.rebuild(fresh.clone()).unwrap();

        assert_eq!(index.len().unwrap(), 50);
        assert!(index.within(GeoPoint::new(1.0, 1.0), 10.0).unwrap().is_empty());
        assert_eq!(index.within(GeoPoint::new(0.0, 0.0), 1.0).unwrap()[0].id, fresh[0].0);
    }

    #[test]
    fn test_invalid_query_returns_nothing() {
        let index = RTreeGeoIndex::new();
        index.insert(Uuid::new_v4(), GeoPoint::new(0.0, 0.0)).unwrap();

        assert!(index.within(GeoPoint::new(0.0, 0.0), -1.0).unwrap().is_empty());
        assert!(index.within(GeoPoint::new(0.0, 0.0), f64::NAN).unwrap().is_empty());
        assert!(index.within(GeoPoint::new(0.0, 95.0), 10.0).unwrap().is_empty());
    }
}
