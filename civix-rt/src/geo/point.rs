//! Geographic point in (longitude, latitude) order
//!
//! On the wire a point is a GeoJSON Point: `{"type":"Point","coordinates":[lon,lat]}`.

use serde::{Deserialize, Serialize};

/// WGS84 point, longitude first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Both coordinates finite and inside [-180,180] x [-90,90]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Explain why a point is unusable
    pub fn validate(&self) -> Result<(), String> {
        if !self.lon.is_finite() || !self.lat.is_finite() {
            return Err(format!(
                "coordinates must be finite numbers, got ({}, {})",
                self.lon, self.lat
            ));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("longitude {} outside [-180, 180]", self.lon));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} outside [-90, 90]", self.lat));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type", default = "point_type")]
    kind: String,
    coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_string()
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = String;

    fn try_from(p: GeoJsonPoint) -> Result<Self, Self::Error> {
        if p.kind != "Point" {
            return Err(format!("expected a GeoJSON Point, got '{}'", p.kind));
        }
        Ok(GeoPoint::new(p.coordinates[0], p.coordinates[1]))
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(p: GeoPoint) -> Self {
        GeoJsonPoint {
            kind: point_type(),
            coordinates: [p.lon, p.lat],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive() {
        assert!(GeoPoint::new(180.0, 90.0).is_valid());
        assert!(GeoPoint::new(-180.0, -90.0).is_valid());
        assert!(GeoPoint::new(0.0, 0.0).is_valid());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(GeoPoint::new(180.0001, 0.0).validate().unwrap_err().contains("longitude"));
        assert!(GeoPoint::new(0.0, -90.5).validate().unwrap_err().contains("latitude"));
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_geojson_wire_format_is_lon_lat() {
        let p: GeoPoint =
            serde_json::from_str(r#"{"type":"Point","coordinates":[-79.3832,43.6532]}"#).unwrap();
        assert_eq!(p, GeoPoint::new(-79.3832, 43.6532));

        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -79.3832);
        assert_eq!(json["coordinates"][1], 43.6532);
    }

    #[test]
    fn test_non_point_geometry_rejected() {
        let err = serde_json::from_str::<GeoPoint>(
            r#"{"type":"LineString","coordinates":[1.5,2.5]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("LineString"));

        assert!(serde_json::from_str::<GeoPoint>(r#"{"type":"point","coordinates":[1.5,2.5]}"#).is_err());
    }

    #[test]
    fn test_type_field_optional() {
        let p: GeoPoint = serde_json::from_str(r#"{"coordinates":[1.5,2.5]}"#).unwrap();
        assert_eq!(p, GeoPoint::new(1.5, 2.5));
    }
}
