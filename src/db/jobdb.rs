// db/jobdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::{
    models::jobmodel::*,
    utils::geo::BoundingBox,
};

const JOB_COLUMNS: &str = r#"
    id, employer_id, title, description,
    latitude, longitude, address,
    compensation, payment_method, approx_duration,
    due_by, tools, work_start, work_end,
    status, claimed_by, claimed_at,
    created_at, updated_at, expires_at
"#;

#[async_trait]
pub trait JobExt {
    async fn insert_job(&self, job: NewJob) -> Result<Job, Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, Error>;

    /// Conditional status write. `Ok(None)` means the precondition no longer
    /// held (or the job does not exist) and nothing was written. A requested
    /// pending rating is stored in the same write, or not at all.
    async fn transition_job(&self, transition: StatusTransition) -> Result<Option<Job>, Error>;

    /// Posted, not yet due or expired, located inside `bbox`. Unordered.
    async fn find_open_jobs_in_box(
        &self,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, Error>;

    /// Non-terminal jobs whose due date or expiry has passed.
    async fn list_overdue_job_ids(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn insert_job(&self, job: NewJob) -> Result<Job, Error> {
        let (work_start, work_end) = match job.work_window {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs
            (id, employer_id, title, description, latitude, longitude, address,
            compensation, payment_method, approx_duration, due_by, tools,
            work_start, work_end, status, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16, $17)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(job.employer_id)
        .bind(job.title)
        .bind(job.description)
        .bind(job.point.lat)
        .bind(job.point.lon)
        .bind(job.address)
        .bind(job.compensation)
        .bind(job.payment_method)
        .bind(job.approx_duration)
        .bind(job.due_by)
        .bind(job.tools)
        .bind(work_start)
        .bind(work_end)
        .bind(JobStatus::Posted)
        .bind(job.created_at)
        .bind(job.expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE employer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn transition_job(&self, transition: StatusTransition) -> Result<Option<Job>, Error> {
        let (claim_mode, claimant) = match transition.claim {
            ClaimChange::Keep => ("keep", None),
            ClaimChange::Set(worker_id) => ("set", Some(worker_id)),
            ClaimChange::Clear => ("clear", None),
        };

        let mut tx = self.pool.begin().await?;

        // Status (and claimant/employer) are checked in the same statement
        // that writes, so a concurrent writer makes this match zero rows.
        let updated = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = $3,
                claimed_by = CASE $6
                    WHEN 'set' THEN $7::uuid
                    WHEN 'clear' THEN NULL
                    ELSE claimed_by END,
                claimed_at = CASE $6
                    WHEN 'set' THEN $8
                    WHEN 'clear' THEN NULL
                    ELSE claimed_at END,
                updated_at = $8
            WHERE id = $1
              AND status = $2
              AND ($4::uuid IS NULL OR claimed_by = $4)
              AND ($5::uuid IS NULL OR employer_id = $5)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(transition.job_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.expected_claimant)
        .bind(transition.expected_employer)
        .bind(claim_mode)
        .bind(claimant)
        .bind(transition.at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(request) = transition.rating {
            sqlx::query(
                r#"
                INSERT INTO ratings (id, job_id, rater_id, ratee_id, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (job_id, rater_id, ratee_id) DO NOTHING
                "#
            )
            .bind(Uuid::new_v4())
            .bind(job.id)
            .bind(request.rater_id)
            .bind(request.ratee_id)
            .bind(transition.at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(job))
    }

    async fn find_open_jobs_in_box(
        &self,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE status = $1
              AND (due_by IS NULL OR due_by > $2)
              AND expires_at > $2
              AND latitude BETWEEN $3 AND $4
              AND ($5::float8 IS NULL OR longitude BETWEEN $5 AND $6)
            "#
        ))
        .bind(JobStatus::Posted)
        .bind(now)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_overdue_job_ids(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM jobs
            WHERE status IN ('Posted', 'Claimed', 'InProgress')
              AND (expires_at <= $1 OR (due_by IS NOT NULL AND due_by <= $1))
            ORDER BY expires_at ASC
            LIMIT $2
            "#
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
