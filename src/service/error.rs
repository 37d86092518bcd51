use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::jobmodel::{JobAction, JobStatus},
    service::geocoding_service::GeocodeError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {actor} is not allowed to {action}")]
    Unauthorized { actor: Uuid, action: String },

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Location {0} not found")]
    LocationNotFound(Uuid),

    #[error("Worker {0} has not registered a location")]
    WorkerLocationNotFound(Uuid),

    #[error("Rating {0} not found")]
    RatingNotFound(Uuid),

    #[error("Cannot {action} job {job_id} while it is {current}")]
    InvalidTransition {
        job_id: Uuid,
        action: JobAction,
        current: JobStatus,
    },

    /// A conditional write lost to a concurrent one. Carries the state the
    /// job is in now so the caller can refresh.
    #[error("Job {job_id} changed concurrently; it is now {current}")]
    Conflict {
        job_id: Uuid,
        action: JobAction,
        current: JobStatus,
    },

    #[error("Location can only be changed once per day; next change allowed at {retry_after}")]
    RateLimited { retry_after: DateTime<Utc> },

    #[error("Geocoding failed: {0}")]
    Geocoding(#[from] GeocodeError),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn unauthorized(actor: Uuid, action: impl Into<String>) -> Self {
        ServiceError::Unauthorized {
            actor,
            action: action.into(),
        }
    }

    /// Conflicts are the racing flavour of an invalid transition.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidTransition { .. } | ServiceError::Conflict { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Unauthorized { .. } => StatusCode::FORBIDDEN,

            ServiceError::JobNotFound(_)
            | ServiceError::LocationNotFound(_)
            | ServiceError::WorkerLocationNotFound(_)
            | ServiceError::RatingNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidTransition { .. } | ServiceError::Conflict { .. } => StatusCode::CONFLICT,

            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            ServiceError::Geocoding(GeocodeError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Geocoding(GeocodeError::NoMatch(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Geocoding(_) | ServiceError::Notification(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Conflict { action: JobAction::Claim, .. } => {
                HttpError::conflict(ErrorMessage::JobJustClaimed.to_string())
            }
            ServiceError::InvalidTransition {
                action: JobAction::Claim,
                current,
                ..
            } if current.has_claimant() => HttpError::conflict(ErrorMessage::JobJustClaimed.to_string()),
            ServiceError::Unauthorized { .. } => {
                HttpError::forbidden(ErrorMessage::PermissionDenied.to_string())
            }
            ServiceError::Database(e) => {
                tracing::error!("Storage failure: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            other => HttpError::new(other.to_string(), status),
        }
    }
}
