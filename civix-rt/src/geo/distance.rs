//! Great-circle distance on a spherical Earth

use super::GeoPoint;

/// Mean Earth radius in meters (IUGG)
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two points, in meters
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_MEAN_RADIUS_M * c
}
