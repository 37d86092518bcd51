// db/locationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::locationmodel::*;

#[async_trait]
pub trait LocationExt {
    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>, Error>;

    async fn get_worker_location(&self, worker_id: Uuid) -> Result<Option<Location>, Error>;

    /// Insert or replace the worker's location, but only when the existing
    /// record was last written at or before `cutoff`. Check and write are one
    /// statement.
    async fn replace_worker_location(
        &self,
        location: NewLocation,
        cutoff: DateTime<Utc>,
    ) -> Result<Relocation, Error>;

    async fn insert_location(&self, location: NewLocation) -> Result<Location, Error>;

    /// Deletes an employer location only if `owner_id` owns it.
    /// Returns whether a row was removed.
    async fn delete_location(&self, location_id: Uuid, owner_id: Uuid) -> Result<bool, Error>;

    async fn list_locations(&self, owner_id: Uuid) -> Result<Vec<Location>, Error>;
}

#[async_trait]
impl LocationExt for DBClient {
    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>, Error> {
        sqlx::query_as::<_, Location>(
            r#"
            SELECT id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at
            FROM locations
            WHERE id = $1
            "#
        )
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_worker_location(&self, worker_id: Uuid) -> Result<Option<Location>, Error> {
        sqlx::query_as::<_, Location>(
            r#"
            SELECT id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at
            FROM locations
            WHERE owner_id = $1 AND kind = 'worker'
            "#
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn replace_worker_location(
        &self,
        location: NewLocation,
        cutoff: DateTime<Utc>,
    ) -> Result<Relocation, Error> {
        let written = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations
            (id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at)
            VALUES ($1, $2, 'worker', $3, $4, $5, $6, $7, $7)
            ON CONFLICT (owner_id) WHERE kind = 'worker'
            DO UPDATE SET
                address = EXCLUDED.address,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                verified = EXCLUDED.verified,
                updated_at = EXCLUDED.updated_at
            WHERE locations.updated_at <= $8
            RETURNING id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(location.owner_id)
        .bind(&location.address)
        .bind(location.point.lat)
        .bind(location.point.lon)
        .bind(location.verified)
        .bind(location.at)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = written {
            return Ok(Relocation::Written(row));
        }

        let current = self
            .get_worker_location(location.owner_id)
            .await?
            .ok_or(Error::RowNotFound)?;

        Ok(Relocation::TooSoon(current))
    }

    async fn insert_location(&self, location: NewLocation) -> Result<Location, Error> {
        sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations
            (id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(location.owner_id)
        .bind(location.kind)
        .bind(location.address)
        .bind(location.point.lat)
        .bind(location.point.lon)
        .bind(location.verified)
        .bind(location.at)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_location(&self, location_id: Uuid, owner_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM locations
            WHERE id = $1 AND owner_id = $2 AND kind = 'employer'
            "#
        )
        .bind(location_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_locations(&self, owner_id: Uuid) -> Result<Vec<Location>, Error> {
        sqlx::query_as::<_, Location>(
            r#"
            SELECT id, owner_id, kind, address, latitude, longitude, verified, created_at, updated_at
            FROM locations
            WHERE owner_id = $1
            ORDER BY created_at ASC
            "#
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }
}
