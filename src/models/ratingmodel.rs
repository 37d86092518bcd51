use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Rating {
    pub id: Uuid,
    pub job_id: Uuid,
    pub rater_id: Uuid,
    pub ratee_id: Uuid,
    pub stars: Option<i32>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Rating {
    pub fn pending(job_id: Uuid, rater_id: Uuid, ratee_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            rater_id,
            ratee_id,
            stars: None,
            comment: None,
            created_at: at,
            submitted_at: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.stars.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow, PartialEq, Default)]
pub struct RatingSummary {
    pub ratings_count: i64,
    pub average_stars: Option<f64>,
}

/// Outcome of the conditional rating submission write.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingSubmission {
    Stored(Rating),
    /// Stars were already present; nothing was written.
    AlreadySubmitted(Rating),
    WrongRater(Rating),
}
