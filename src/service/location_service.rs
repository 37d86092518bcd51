// service/location_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::JobStore,
    models::{
        locationmodel::*,
        usermodel::{Actor, UserRole},
    },
    service::{error::ServiceError, geocoding_service::ResolvedPlace},
};

/// Minimum time between two changes of a worker's location.
pub const RELOCATION_COOLDOWN_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct LocationService {
    store: Arc<dyn JobStore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn set_worker_location(
        &self,
        actor: &Actor,
        place: ResolvedPlace,
        now: DateTime<Utc>,
    ) -> Result<Location, ServiceError> {
        if !actor.has_role(UserRole::Worker) {
            return Err(ServiceError::unauthorized(actor.id, "set a worker location"));
        }
        validate_place(&place)?;

        let cooldown = Duration::hours(RELOCATION_COOLDOWN_HOURS);
        let location = NewLocation {
            owner_id: actor.id,
            kind: LocationKind::Worker,
            address: place.address,
            point: place.point,
            verified: place.verified,
            at: now,
        };

        match self.store.replace_worker_location(location, now - cooldown).await? {
            Relocation::Written(location) => {
                tracing::info!("Worker {} moved to location {}", actor.id, location.id);
                Ok(location)
            }
            Relocation::TooSoon(current) => {
                let retry_after = current.updated_at + cooldown;
                tracing::warn!(
                    "Worker {} relocation refused until {}",
                    actor.id,
                    retry_after
                );
                Err(ServiceError::RateLimited { retry_after })
            }
        }
    }

    pub async fn get_worker_location(&self, worker_id: Uuid) -> Result<Location, ServiceError> {
        self.store
            .get_worker_location(worker_id)
            .await?
            .ok_or(ServiceError::WorkerLocationNotFound(worker_id))
    }

    pub async fn add_location(
        &self,
        actor: &Actor,
        place: ResolvedPlace,
        now: DateTime<Utc>,
    ) -> Result<Location, ServiceError> {
        if !actor.has_role(UserRole::Employer) {
            return Err(ServiceError::unauthorized(actor.id, "add an employer location"));
        }
        validate_place(&place)?;

        let location = self
            .store
            .insert_location(NewLocation {
                owner_id: actor.id,
                kind: LocationKind::Employer,
                address: place.address,
                point: place.point,
                verified: place.verified,
                at: now,
            })
            .await?;

        tracing::info!("Employer {} saved location {}", actor.id, location.id);
        Ok(location)
    }

    pub async fn delete_location(&self, actor: &Actor, location_id: Uuid) -> Result<(), ServiceError> {
        let location = self
            .store
            .get_location(location_id)
            .await?
            .ok_or(ServiceError::LocationNotFound(location_id))?;

        if location.owner_id != actor.id {
            return Err(ServiceError::unauthorized(actor.id, "delete this location"));
        }
        if location.kind == LocationKind::Worker {
            return Err(ServiceError::Validation(
                "A worker location can be replaced but not deleted".to_string(),
            ));
        }

        if !self.store.delete_location(location_id, actor.id).await? {
            return Err(ServiceError::LocationNotFound(location_id));
        }

        tracing::info!("Employer {} deleted location {}", actor.id, location_id);
        Ok(())
    }

    pub async fn list_locations(&self, owner_id: Uuid) -> Result<Vec<Location>, ServiceError> {
        Ok(self.store.list_locations(owner_id).await?)
    }
}

fn validate_place(place: &ResolvedPlace) -> Result<(), ServiceError> {
    if place.address.trim().is_empty() {
        return Err(ServiceError::Validation("Address is required".to_string()));
    }
    if !place.point.is_valid() {
        return Err(ServiceError::Validation(
            "Coordinates are out of range".to_string(),
        ));
    }
    Ok(())
}
