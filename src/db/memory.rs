// db/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{jobdb::JobExt, locationdb::LocationExt, ratingdb::RatingExt};
use crate::{
    models::{jobmodel::*, locationmodel::*, ratingmodel::*},
    utils::geo::BoundingBox,
};

/// Process-local store with the same conditional-write contract as the
/// Postgres client. Each conditional write holds the table's write lock for
/// both the check and the update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    locations: RwLock<HashMap<Uuid, Location>>,
    ratings: RwLock<HashMap<Uuid, Rating>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobExt for MemoryStore {
    async fn insert_job(&self, job: NewJob) -> Result<Job, Error> {
        let job = job.into_job(Uuid::new_v4());
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, Error> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.employer_id == employer_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn transition_job(&self, transition: StatusTransition) -> Result<Option<Job>, Error> {
        // Lock order is jobs then ratings; nothing takes them the other way.
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&transition.job_id) else {
            return Ok(None);
        };
        if !transition.matches(job) {
            return Ok(None);
        }

        if let Some(request) = transition.rating {
            let mut ratings = self.ratings.write().await;
            let exists = ratings.values().any(|r| {
                r.job_id == job.id
                    && r.rater_id == request.rater_id
                    && r.ratee_id == request.ratee_id
            });
            if !exists {
                let rating =
                    Rating::pending(job.id, request.rater_id, request.ratee_id, transition.at);
                ratings.insert(rating.id, rating);
            }
        }

        transition.apply(job);
        Ok(Some(job.clone()))
    }

    async fn find_open_jobs_in_box(
        &self,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, Error> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_open(now) && bbox.contains(&job.point()))
            .cloned()
            .collect())
    }

    async fn list_overdue_job_ids(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, Error> {
        let jobs = self.jobs.read().await;
        let mut overdue: Vec<&Job> = jobs
            .values()
            .filter(|job| job.status.is_cancellable() && job.is_overdue(now))
            .collect();
        overdue.sort_by_key(|job| job.expires_at);
        Ok(overdue
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| job.id)
            .collect())
    }
}

#[async_trait]
impl LocationExt for MemoryStore {
    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>, Error> {
        Ok(self.locations.read().await.get(&location_id).cloned())
    }

    async fn get_worker_location(&self, worker_id: Uuid) -> Result<Option<Location>, Error> {
        Ok(self
            .locations
            .read()
            .await
            .values()
            .find(|loc| loc.owner_id == worker_id && loc.kind == LocationKind::Worker)
            .cloned())
    }

    async fn replace_worker_location(
        &self,
        location: NewLocation,
        cutoff: DateTime<Utc>,
    ) -> Result<Relocation, Error> {
        let mut locations = self.locations.write().await;

        let existing = locations
            .values_mut()
            .find(|loc| loc.owner_id == location.owner_id && loc.kind == LocationKind::Worker);

        match existing {
            Some(current) if current.updated_at > cutoff => Ok(Relocation::TooSoon(current.clone())),
            Some(current) => {
                current.address = location.address;
                current.latitude = location.point.lat;
                current.longitude = location.point.lon;
                current.verified = location.verified;
                current.updated_at = location.at;
                Ok(Relocation::Written(current.clone()))
            }
            None => {
                let created = NewLocation {
                    kind: LocationKind::Worker,
                    ..location
                }
                .into_location(Uuid::new_v4());
                locations.insert(created.id, created.clone());
                Ok(Relocation::Written(created))
            }
        }
    }

    async fn insert_location(&self, location: NewLocation) -> Result<Location, Error> {
        let location = location.into_location(Uuid::new_v4());
        self.locations
            .write()
            .await
            .insert(location.id, location.clone());
        Ok(location)
    }

    async fn delete_location(&self, location_id: Uuid, owner_id: Uuid) -> Result<bool, Error> {
        let mut locations = self.locations.write().await;
        let owned = locations.get(&location_id).map_or(false, |loc| {
            loc.owner_id == owner_id && loc.kind == LocationKind::Employer
        });
        if owned {
            locations.remove(&location_id);
        }
        Ok(owned)
    }

    async fn list_locations(&self, owner_id: Uuid) -> Result<Vec<Location>, Error> {
        let mut locations: Vec<Location> = self
            .locations
            .read()
            .await
            .values()
            .filter(|loc| loc.owner_id == owner_id)
            .cloned()
            .collect();
        locations.sort_by_key(|loc| loc.created_at);
        Ok(locations)
    }
}

#[async_trait]
impl RatingExt for MemoryStore {
    async fn create_pending_rating(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Rating, Error> {
        let mut ratings = self.ratings.write().await;

        if let Some(existing) = ratings.values().find(|r| {
            r.job_id == job_id && r.rater_id == rater_id && r.ratee_id == ratee_id
        }) {
            return Ok(existing.clone());
        }

        let rating = Rating::pending(job_id, rater_id, ratee_id, at);
        ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    async fn get_rating(&self, rating_id: Uuid) -> Result<Option<Rating>, Error> {
        Ok(self.ratings.read().await.get(&rating_id).cloned())
    }

    async fn submit_rating(
        &self,
        rating_id: Uuid,
        rater_id: Uuid,
        stars: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<RatingSubmission>, Error> {
        let mut ratings = self.ratings.write().await;
        let Some(rating) = ratings.get_mut(&rating_id) else {
            return Ok(None);
        };

        if rating.rater_id != rater_id {
            return Ok(Some(RatingSubmission::WrongRater(rating.clone())));
        }
        if rating.is_submitted() {
            return Ok(Some(RatingSubmission::AlreadySubmitted(rating.clone())));
        }

        rating.stars = Some(stars);
        rating.comment = comment;
        rating.submitted_at = Some(at);
        Ok(Some(RatingSubmission::Stored(rating.clone())))
    }

    async fn list_submitted_ratings_for(&self, ratee_id: Uuid) -> Result<Vec<Rating>, Error> {
        let mut ratings: Vec<Rating> = self
            .ratings
            .read()
            .await
            .values()
            .filter(|r| r.ratee_id == ratee_id && r.is_submitted())
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(ratings)
    }

    async fn rating_summary_for(&self, ratee_id: Uuid) -> Result<RatingSummary, Error> {
        let ratings = self.ratings.read().await;
        let stars: Vec<i32> = ratings
            .values()
            .filter(|r| r.ratee_id == ratee_id)
            .filter_map(|r| r.stars)
            .collect();

        let ratings_count = stars.len() as i64;
        let average_stars = if stars.is_empty() {
            None
        } else {
            Some(stars.iter().map(|s| *s as f64).sum::<f64>() / ratings_count as f64)
        };

        Ok(RatingSummary {
            ratings_count,
            average_stars,
        })
    }
}
