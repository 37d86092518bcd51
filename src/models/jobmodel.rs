use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

// Variant names are the persisted literals.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "job_status")]
pub enum JobStatus {
    Posted,
    Claimed,
    InProgress,
    WorkerDone,
    ConfirmedDone,
    Cancelled,
    Expired,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Posted => "Posted",
            JobStatus::Claimed => "Claimed",
            JobStatus::InProgress => "InProgress",
            JobStatus::WorkerDone => "WorkerDone",
            JobStatus::ConfirmedDone => "ConfirmedDone",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Expired => "Expired",
        }
    }

    /// Statuses in which a worker is bound to the job.
    pub fn has_claimant(&self) -> bool {
        matches!(
            self,
            JobStatus::Claimed
                | JobStatus::InProgress
                | JobStatus::WorkerDone
                | JobStatus::ConfirmedDone
        )
    }

    /// Statuses a cancel or expiry may start from.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            JobStatus::Posted | JobStatus::Claimed | JobStatus::InProgress
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JobAction {
    Claim,
    StartWork,
    MarkWorkerComplete,
    ConfirmComplete,
    Cancel,
    Expire,
}

impl JobAction {
    pub fn to_str(&self) -> &str {
        match self {
            JobAction::Claim => "claim",
            JobAction::StartWork => "startWork",
            JobAction::MarkWorkerComplete => "markWorkerComplete",
            JobAction::ConfirmComplete => "confirmComplete",
            JobAction::Cancel => "cancel",
            JobAction::Expire => "expire",
        }
    }
}

impl std::fmt::Display for JobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub compensation: BigDecimal,
    pub payment_method: String,
    pub approx_duration: Option<String>,
    pub due_by: Option<DateTime<Utc>>,
    pub tools: Option<String>,
    pub work_start: Option<DateTime<Utc>>,
    pub work_end: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub claimed_by: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Job {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// True once either deadline has elapsed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now || self.due_by.map_or(false, |due| due <= now)
    }

    /// Open for discovery: still Posted and neither deadline has passed.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Posted && !self.is_overdue(now)
    }
}

/// Fields of a job as accepted from an employer, already validated.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub point: GeoPoint,
    pub address: Option<String>,
    pub compensation: BigDecimal,
    pub payment_method: String,
    pub approx_duration: Option<String>,
    pub due_by: Option<DateTime<Utc>>,
    pub tools: Option<String>,
    pub work_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewJob {
    pub fn into_job(self, id: Uuid) -> Job {
        Job {
            id,
            employer_id: self.employer_id,
            title: self.title,
            description: self.description,
            latitude: self.point.lat,
            longitude: self.point.lon,
            address: self.address,
            compensation: self.compensation,
            payment_method: self.payment_method,
            approx_duration: self.approx_duration,
            due_by: self.due_by,
            tools: self.tools,
            work_start: self.work_window.map(|(start, _)| start),
            work_end: self.work_window.map(|(_, end)| end),
            status: JobStatus::Posted,
            claimed_by: None,
            claimed_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClaimChange {
    Keep,
    Set(Uuid),
    Clear,
}

/// A conditional status write: applied only if the stored job still has
/// `from` as its status and, when given, the expected claimant/employer.
#[derive(Debug, Clone, Copy)]
pub struct StatusTransition {
    pub job_id: Uuid,
    pub from: JobStatus,
    pub to: JobStatus,
    pub expected_claimant: Option<Uuid>,
    pub expected_employer: Option<Uuid>,
    pub claim: ClaimChange,
    /// Pending rating stored in the same write as the status change.
    pub rating: Option<RatingRequest>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingRequest {
    pub rater_id: Uuid,
    pub ratee_id: Uuid,
}

impl StatusTransition {
    pub fn new(job_id: Uuid, from: JobStatus, to: JobStatus, at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            from,
            to,
            expected_claimant: None,
            expected_employer: None,
            claim: ClaimChange::Keep,
            rating: None,
            at,
        }
    }

    pub fn claimed_by(mut self, worker_id: Uuid) -> Self {
        self.expected_claimant = Some(worker_id);
        self
    }

    pub fn owned_by(mut self, employer_id: Uuid) -> Self {
        self.expected_employer = Some(employer_id);
        self
    }

    pub fn with_claim(mut self, claim: ClaimChange) -> Self {
        self.claim = claim;
        self
    }

    pub fn requesting_rating(mut self, rater_id: Uuid, ratee_id: Uuid) -> Self {
        self.rating = Some(RatingRequest { rater_id, ratee_id });
        self
    }

    /// Whether `job` satisfies every precondition of this write.
    pub fn matches(&self, job: &Job) -> bool {
        job.id == self.job_id
            && job.status == self.from
            && self.expected_claimant.map_or(true, |w| job.claimed_by == Some(w))
            && self.expected_employer.map_or(true, |e| job.employer_id == e)
    }

    /// Apply this write to an in-memory job. Callers must check `matches` first.
    pub fn apply(&self, job: &mut Job) {
        job.status = self.to;
        match self.claim {
            ClaimChange::Keep => {}
            ClaimChange::Set(worker_id) => {
                job.claimed_by = Some(worker_id);
                job.claimed_at = Some(self.at);
            }
            ClaimChange::Clear => {
                job.claimed_by = None;
                job.claimed_at = None;
            }
        }
        job.updated_at = self.at;
    }
}
