use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::models::jobmodel::JobAction;

/// Used when a search does not say how far to look.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 5_000.0;

#[derive(Debug, Deserialize, Validate)]
pub struct NearbyJobsQuery {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub lon: f64,

    /// Meters.
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerNearbyQuery {
    pub radius: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: String,

    /// A saved employer location; takes precedence over coordinates.
    pub location_id: Option<Uuid>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,

    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,

    pub compensation: BigDecimal,

    #[validate(length(min = 1, max = 50, message = "Payment method is required"))]
    pub payment_method: String,

    #[validate(length(max = 100, message = "Duration must be at most 100 characters"))]
    pub approx_duration: Option<String>,

    pub due_by: Option<DateTime<Utc>>,

    #[validate(length(max = 500, message = "Tools must be at most 500 characters"))]
    pub tools: Option<String>,

    pub work_start: Option<DateTime<Utc>>,
    pub work_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionJobDto {
    pub action: JobAction,
}
