//! Geospatial primitives and the report location index

pub mod distance;
pub mod index;
pub mod point;

pub use distance::{haversine_distance, EARTH_MEAN_RADIUS_M};
pub use index::{GeoIndex, IndexError, Neighbor, RTreeGeoIndex};
pub use point::GeoPoint;
