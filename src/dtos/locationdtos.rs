use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::geo::GeoPoint;

/// Body for both the worker location and employer location endpoints.
/// Coordinates are optional; without them the address is geocoded.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LocationDto {
    #[validate(length(min = 1, max = 300, message = "Address must be between 1 and 300 characters"))]
    pub address: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

impl LocationDto {
    /// `Err` when only one of the two coordinates was sent.
    pub fn point(&self) -> Result<Option<GeoPoint>, &'static str> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon))),
            (None, None) => Ok(None),
            _ => Err("Latitude and longitude must be given together"),
        }
    }
}
