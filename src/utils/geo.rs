// utils/geo.rs
use serde::{Deserialize, Serialize};

/// Mean Earth radius (IUGG), in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in meters (haversine on a spherical Earth).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);

        // Clamp guards against a > 1 from rounding on antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_M * c
    }
}

/// Lat/lon rectangle enclosing every point within `radius` of a center.
///
/// Used as a cheap index-friendly prefilter; exact distances are computed
/// afterwards. `min_lon`/`max_lon` are `None` when the box touches a pole or
/// wraps the antimeridian, in which case no longitude bound applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let angular = radius_m / EARTH_RADIUS_M;
        let dlat = angular.to_degrees();

        let min_lat = center.lat - dlat;
        let max_lat = center.lat + dlat;

        if min_lat <= -90.0 || max_lat >= 90.0 || angular >= std::f64::consts::FRAC_PI_2 {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                min_lon: None,
                max_lon: None,
            };
        }

        let ratio = angular.sin() / center.lat.to_radians().cos();
        if ratio >= 1.0 {
            return Self { min_lat, max_lat, min_lon: None, max_lon: None };
        }
        let dlon = ratio.asin().to_degrees();
        let (min_lon, max_lon) = (center.lon - dlon, center.lon + dlon);

        if min_lon < -180.0 || max_lon > 180.0 {
            return Self { min_lat, max_lat, min_lon: None, max_lon: None };
        }

        Self {
            min_lat,
            max_lat,
            min_lon: Some(min_lon),
            max_lon: Some(max_lon),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        let lat_ok = point.lat >= self.min_lat && point.lat <= self.max_lat;
        let lon_ok = match (self.min_lon, self.max_lon) {
            (Some(min), Some(max)) => point.lon >= min && point.lon <= max,
            _ => true,
        };
        lat_ok && lon_ok
    }
}
