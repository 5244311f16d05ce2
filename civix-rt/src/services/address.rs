//! Address resolution collaborator
//!
//! Reverse geocoding happens outside this service. A resolver may answer at
//! create time; late answers arrive through `ReportStore::set_resolved_address`.

use crate::geo::GeoPoint;

/// Supplies a human-readable address for a coordinate
pub trait AddressResolver: Send + Sync {
    /// `None` when no label is available yet
    fn lookup(&self, point: GeoPoint) -> Option<String>;
}

/// Resolver that never knows an address; reports keep the placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAddressResolver;

impl AddressResolver for PlaceholderAddressResolver {
    fn lookup(&self, _point: GeoPoint) -> Option<String> {
        None
    }
}
