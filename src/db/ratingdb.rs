// db/ratingdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::ratingmodel::*;

#[async_trait]
pub trait RatingExt {
    /// Creates the pending rating for one direction of a job, or returns the
    /// one that already exists for the same (job, rater, ratee).
    async fn create_pending_rating(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Rating, Error>;

    async fn get_rating(&self, rating_id: Uuid) -> Result<Option<Rating>, Error>;

    /// Fills in stars/comment only if `rater_id` matches and no stars are
    /// stored yet. `Ok(None)` means the rating does not exist.
    async fn submit_rating(
        &self,
        rating_id: Uuid,
        rater_id: Uuid,
        stars: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<RatingSubmission>, Error>;

    async fn list_submitted_ratings_for(&self, ratee_id: Uuid) -> Result<Vec<Rating>, Error>;

    async fn rating_summary_for(&self, ratee_id: Uuid) -> Result<RatingSummary, Error>;
}

#[async_trait]
impl RatingExt for DBClient {
    async fn create_pending_rating(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Rating, Error> {
        let inserted = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (id, job_id, rater_id, ratee_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id, rater_id, ratee_id) DO NOTHING
            RETURNING id, job_id, rater_id, ratee_id, stars, comment, created_at, submitted_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(rater_id)
        .bind(ratee_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(rating) = inserted {
            return Ok(rating);
        }

        sqlx::query_as::<_, Rating>(
            r#"
            SELECT id, job_id, rater_id, ratee_id, stars, comment, created_at, submitted_at
            FROM ratings
            WHERE job_id = $1 AND rater_id = $2 AND ratee_id = $3
            "#
        )
        .bind(job_id)
        .bind(rater_id)
        .bind(ratee_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_rating(&self, rating_id: Uuid) -> Result<Option<Rating>, Error> {
        sqlx::query_as::<_, Rating>(
            r#"
            SELECT id, job_id, rater_id, ratee_id, stars, comment, created_at, submitted_at
            FROM ratings
            WHERE id = $1
            "#
        )
        .bind(rating_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn submit_rating(
        &self,
        rating_id: Uuid,
        rater_id: Uuid,
        stars: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<RatingSubmission>, Error> {
        let stored = sqlx::query_as::<_, Rating>(
            r#"
            UPDATE ratings
            SET stars = $3, comment = $4, submitted_at = $5
            WHERE id = $1 AND rater_id = $2 AND stars IS NULL
            RETURNING id, job_id, rater_id, ratee_id, stars, comment, created_at, submitted_at
            "#
        )
        .bind(rating_id)
        .bind(rater_id)
        .bind(stars)
        .bind(comment)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(rating) = stored {
            return Ok(Some(RatingSubmission::Stored(rating)));
        }

        let current = self.get_rating(rating_id).await?;
        Ok(current.map(|rating| {
            if rating.rater_id != rater_id {
                RatingSubmission::WrongRater(rating)
            } else {
                RatingSubmission::AlreadySubmitted(rating)
            }
        }))
    }

    async fn list_submitted_ratings_for(&self, ratee_id: Uuid) -> Result<Vec<Rating>, Error> {
        sqlx::query_as::<_, Rating>(
            r#"
            SELECT id, job_id, rater_id, ratee_id, stars, comment, created_at, submitted_at
            FROM ratings
            WHERE ratee_id = $1 AND stars IS NOT NULL
            ORDER BY submitted_at DESC
            "#
        )
        .bind(ratee_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn rating_summary_for(&self, ratee_id: Uuid) -> Result<RatingSummary, Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT COUNT(stars) AS ratings_count, AVG(stars)::float8 AS average_stars
            FROM ratings
            WHERE ratee_id = $1 AND stars IS NOT NULL
            "#
        )
        .bind(ratee_id)
        .fetch_one(&self.pool)
        .await
    }
}
