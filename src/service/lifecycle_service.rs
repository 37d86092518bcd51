// service/lifecycle_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use num_traits::Zero;
use serde::Serialize;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::JobStore,
    models::{
        jobmodel::*,
        ratingmodel::Rating,
        usermodel::{Actor, UserRole},
    },
    service::{
        error::ServiceError, notification_service::NotificationService,
        rating_service::RatingService,
    },
    utils::geo::GeoPoint,
};

pub const MAX_TITLE_CHARS: usize = 200;

/// Where a new job takes place.
#[derive(Debug, Clone)]
pub enum JobLocationInput {
    /// One of the employer's saved locations.
    Saved(Uuid),
    Explicit {
        point: GeoPoint,
        address: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub location: JobLocationInput,
    pub compensation: BigDecimal,
    pub payment_method: String,
    pub approx_duration: Option<String>,
    pub due_by: Option<DateTime<Utc>>,
    pub tools: Option<String>,
    pub work_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub job: Job,
    /// Pending rating created as a side effect of a completion step.
    pub rating: Option<Rating>,
}

/// Rater and ratee of the rating a completion step asks for.
fn completion_rating(action: JobAction, job: &Job, worker: Uuid) -> (Uuid, Uuid) {
    match action {
        JobAction::ConfirmComplete => (job.employer_id, worker),
        _ => (worker, job.employer_id),
    }
}

/// The one capability check behind every transition guard.
pub fn authorize(actor: &Actor, job: &Job, action: JobAction) -> bool {
    match action {
        JobAction::Claim => actor.has_role(UserRole::Worker) && actor.id != job.employer_id,
        JobAction::StartWork | JobAction::MarkWorkerComplete => job.claimed_by == Some(actor.id),
        JobAction::ConfirmComplete | JobAction::Cancel => job.employer_id == actor.id,
        JobAction::Expire => false,
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleService {
    store: Arc<dyn JobStore>,
    ratings: Arc<RatingService>,
    notifications: NotificationService,
    job_ttl: Duration,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn JobStore>,
        ratings: Arc<RatingService>,
        notifications: NotificationService,
        job_ttl: Duration,
    ) -> Self {
        Self {
            store,
            ratings,
            notifications,
            job_ttl,
        }
    }

    pub async fn post_job(
        &self,
        actor: &Actor,
        draft: JobDraft,
        now: DateTime<Utc>,
    ) -> Result<Job, ServiceError> {
        if !actor.has_role(UserRole::Employer) {
            return Err(ServiceError::unauthorized(actor.id, "post a job"));
        }

        let title = draft.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::Validation(format!(
                "Title is required and must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }
        if draft.compensation <= BigDecimal::zero() {
            return Err(ServiceError::Validation(
                "Compensation must be greater than zero".to_string(),
            ));
        }
        let payment_method = draft.payment_method.trim().to_string();
        if payment_method.is_empty() {
            return Err(ServiceError::Validation(
                "Payment method is required".to_string(),
            ));
        }
        if let Some((start, end)) = draft.work_window {
            if start >= end {
                return Err(ServiceError::Validation(
                    "Work window must start before it ends".to_string(),
                ));
            }
            if start <= now {
                return Err(ServiceError::Validation(
                    "Work window must be in the future".to_string(),
                ));
            }
        }
        if draft.due_by.map_or(false, |due| due <= now) {
            return Err(ServiceError::Validation(
                "Due date must be in the future".to_string(),
            ));
        }

        let (point, address) = match draft.location {
            JobLocationInput::Saved(location_id) => {
                let location = self
                    .store
                    .get_location(location_id)
                    .await?
                    .ok_or(ServiceError::LocationNotFound(location_id))?;
                if location.owner_id != actor.id {
                    return Err(ServiceError::unauthorized(actor.id, "use this location"));
                }
                (location.point(), Some(location.address))
            }
            JobLocationInput::Explicit { point, address } => {
                if !point.is_valid() {
                    return Err(ServiceError::Validation(
                        "Coordinates are out of range".to_string(),
                    ));
                }
                let address = address
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty());
                (point, address)
            }
        };

        let job = self
            .store
            .insert_job(NewJob {
                employer_id: actor.id,
                title,
                description: draft.description.trim().to_string(),
                point,
                address,
                compensation: draft.compensation,
                payment_method,
                approx_duration: draft.approx_duration,
                due_by: draft.due_by,
                tools: draft.tools,
                work_window: draft.work_window,
                created_at: now,
                expires_at: now + self.job_ttl,
            })
            .await?;

        tracing::info!("Employer {} posted job {}", actor.id, job.id);
        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn list_employer_jobs(&self, employer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        Ok(self.store.list_jobs_by_employer(employer_id).await?)
    }

    /// Posted -> Claimed. Exactly one concurrent caller can win; the rest get
    /// a `Conflict` carrying the job's current status.
    pub async fn claim(
        &self,
        actor: &Actor,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;

        if !authorize(actor, &job, JobAction::Claim) {
            return Err(ServiceError::unauthorized(actor.id, JobAction::Claim.to_str()));
        }

        if job.status == JobStatus::Posted && job.is_overdue(now) {
            // Expire it now instead of waiting for the sweep.
            let current = match self.expire_job(&job, now).await {
                Ok(expired) => expired.status,
                Err(ServiceError::Conflict { current, .. }) => current,
                Err(e) => return Err(e),
            };
            return Err(ServiceError::InvalidTransition {
                job_id,
                action: JobAction::Claim,
                current,
            });
        }

        if job.status != JobStatus::Posted {
            return Err(if job.status.has_claimant() {
                ServiceError::Conflict {
                    job_id,
                    action: JobAction::Claim,
                    current: job.status,
                }
            } else {
                ServiceError::InvalidTransition {
                    job_id,
                    action: JobAction::Claim,
                    current: job.status,
                }
            });
        }

        let transition = StatusTransition::new(job_id, JobStatus::Posted, JobStatus::Claimed, now)
            .with_claim(ClaimChange::Set(actor.id));

        let claimed = self.write(transition, JobAction::Claim).await?;

        tracing::info!("Worker {} claimed job {}", actor.id, job_id);
        self.notifications.notify_job_claimed(&claimed, actor.id);
        Ok(claimed)
    }

    /// Any actor-driven transition. Completion steps also create the pending
    /// rating for their direction and queue the link for the rater.
    pub async fn transition(
        &self,
        actor: &Actor,
        job_id: Uuid,
        action: JobAction,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ServiceError> {
        if action == JobAction::Claim {
            let job = self.claim(actor, job_id, now).await?;
            return Ok(TransitionOutcome { job, rating: None });
        }

        let job = self.get_job(job_id).await?;

        if !authorize(actor, &job, action) {
            return Err(ServiceError::unauthorized(actor.id, action.to_str()));
        }

        // Repeating a committed completion step returns its rating again.
        match (action, job.status, job.claimed_by) {
            (JobAction::MarkWorkerComplete, JobStatus::WorkerDone, Some(worker))
            | (JobAction::ConfirmComplete, JobStatus::ConfirmedDone, Some(worker)) => {
                let (rater, ratee) = completion_rating(action, &job, worker);
                let rating = self.request_rating(&job, rater, ratee, now).await?;
                return Ok(TransitionOutcome {
                    job,
                    rating: Some(rating),
                });
            }
            _ => {}
        }

        let invalid = ServiceError::InvalidTransition {
            job_id,
            action,
            current: job.status,
        };

        let transition = match (action, job.claimed_by) {
            (JobAction::StartWork, _) if job.status == JobStatus::Claimed => {
                StatusTransition::new(job_id, JobStatus::Claimed, JobStatus::InProgress, now)
                    .claimed_by(actor.id)
            }
            (JobAction::MarkWorkerComplete, Some(worker)) if job.status == JobStatus::InProgress => {
                let (rater, ratee) = completion_rating(action, &job, worker);
                StatusTransition::new(job_id, JobStatus::InProgress, JobStatus::WorkerDone, now)
                    .claimed_by(worker)
                    .requesting_rating(rater, ratee)
            }
            (JobAction::ConfirmComplete, Some(worker)) if job.status == JobStatus::WorkerDone => {
                let (rater, ratee) = completion_rating(action, &job, worker);
                StatusTransition::new(job_id, JobStatus::WorkerDone, JobStatus::ConfirmedDone, now)
                    .owned_by(actor.id)
                    .claimed_by(worker)
                    .requesting_rating(rater, ratee)
            }
            (JobAction::Cancel, _) if job.status.is_cancellable() => {
                StatusTransition::new(job_id, job.status, JobStatus::Cancelled, now)
                    .owned_by(actor.id)
                    .with_claim(ClaimChange::Clear)
            }
            _ => return Err(invalid),
        };

        let updated = self.write(transition, action).await?;
        tracing::info!(
            "Job {} moved {} -> {} by {}",
            job_id,
            transition.from,
            updated.status,
            actor.id
        );

        // The pending rating was stored with the status; this reads it back
        // and queues the link.
        let rating = match transition.rating {
            Some(request) => Some(
                self.request_rating(&updated, request.rater_id, request.ratee_id, now)
                    .await?,
            ),
            None => None,
        };

        Ok(TransitionOutcome {
            job: updated,
            rating,
        })
    }

    /// System transition to Expired once the due date or expiry has passed.
    pub async fn expire(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;
        self.expire_job(&job, now).await
    }

    /// Expire up to `limit` overdue jobs. Jobs that moved on concurrently are
    /// skipped. Returns how many were expired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>, limit: i64) -> Result<usize, ServiceError> {
        let ids = self.store.list_overdue_job_ids(now, limit).await?;
        let mut expired = 0;

        for job_id in ids {
            match self.expire(job_id, now).await {
                Ok(_) => expired += 1,
                Err(e) if e.is_invalid_transition() => {
                    tracing::warn!("Skipping expiry of job {}: {}", job_id, e);
                }
                Err(e) => {
                    tracing::error!("Failed to expire job {}: {}", job_id, e);
                }
            }
        }

        Ok(expired)
    }

    async fn expire_job(&self, job: &Job, now: DateTime<Utc>) -> Result<Job, ServiceError> {
        if !job.status.is_cancellable() || !job.is_overdue(now) {
            return Err(ServiceError::InvalidTransition {
                job_id: job.id,
                action: JobAction::Expire,
                current: job.status,
            });
        }

        let transition = StatusTransition::new(job.id, job.status, JobStatus::Expired, now)
            .with_claim(ClaimChange::Clear);
        let expired = self.write(transition, JobAction::Expire).await?;

        tracing::info!("Job {} expired from {}", job.id, job.status);
        Ok(expired)
    }

    /// Runs the conditional write; a miss is reported as `Conflict` with the
    /// job's status as re-read after the miss.
    async fn write(&self, transition: StatusTransition, action: JobAction) -> Result<Job, ServiceError> {
        if let Some(job) = self.store.transition_job(transition).await? {
            return Ok(job);
        }

        let current = self
            .store
            .get_job(transition.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(transition.job_id))?;

        tracing::warn!(
            "Lost {} on job {}: expected {}, found {}",
            action,
            transition.job_id,
            transition.from,
            current.status
        );

        Err(ServiceError::Conflict {
            job_id: transition.job_id,
            action,
            current: current.status,
        })
    }

    async fn request_rating(
        &self,
        job: &Job,
        rater_id: Uuid,
        ratee_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Rating, ServiceError> {
        let rating = self.ratings.create_link(job.id, rater_id, ratee_id, now).await?;
        self.notifications
            .notify_rating_link(job, &rating, self.ratings.link_url(rating.id));
        Ok(rating)
    }
}
