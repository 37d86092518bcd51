use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "location_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// A worker's single current position.
    Worker,
    /// One of an employer's saved job sites.
    Employer,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: LocationKind,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub owner_id: Uuid,
    pub kind: LocationKind,
    pub address: String,
    pub point: GeoPoint,
    pub verified: bool,
    pub at: DateTime<Utc>,
}

impl NewLocation {
    pub fn into_location(self, id: Uuid) -> Location {
        Location {
            id,
            owner_id: self.owner_id,
            kind: self.kind,
            address: self.address,
            latitude: self.point.lat,
            longitude: self.point.lon,
            verified: self.verified,
            created_at: self.at,
            updated_at: self.at,
        }
    }
}

/// Outcome of the conditional worker relocation write.
#[derive(Debug, Clone, PartialEq)]
pub enum Relocation {
    Written(Location),
    /// The existing record is younger than the cooldown; nothing was written.
    TooSoon(Location),
}
