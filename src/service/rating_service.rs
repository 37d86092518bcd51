// service/rating_service.rs
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::JobStore,
    models::{ratingmodel::*, usermodel::Actor},
    service::error::ServiceError,
    utils::ttl_cache::TtlCache,
};

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug)]
pub struct RatingService {
    store: Arc<dyn JobStore>,
    summary_cache: TtlCache<Uuid, RatingSummary>,
    app_url: String,
}

impl RatingService {
    pub fn new(store: Arc<dyn JobStore>, app_url: impl Into<String>, summary_ttl: Duration) -> Self {
        Self {
            store,
            summary_cache: TtlCache::new(summary_ttl),
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Pending rating for one direction of a finished job. Calling it again
    /// for the same triple returns the existing record.
    pub async fn create_link(
        &self,
        job_id: Uuid,
        rater_id: Uuid,
        ratee_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Rating, ServiceError> {
        let rating = self
            .store
            .create_pending_rating(job_id, rater_id, ratee_id, now)
            .await?;

        tracing::info!(
            "Rating link {} ready for job {} ({} -> {})",
            rating.id,
            job_id,
            rater_id,
            ratee_id
        );
        Ok(rating)
    }

    pub fn link_url(&self, rating_id: Uuid) -> String {
        format!("{}/rate/{}", self.app_url, rating_id)
    }

    pub async fn resolve(&self, rating_id: Uuid) -> Result<Rating, ServiceError> {
        self.store
            .get_rating(rating_id)
            .await?
            .ok_or(ServiceError::RatingNotFound(rating_id))
    }

    pub async fn submit(
        &self,
        rating_id: Uuid,
        actor: &Actor,
        stars: i32,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Rating, ServiceError> {
        let rating = self.resolve(rating_id).await?;

        if rating.rater_id != actor.id {
            return Err(ServiceError::unauthorized(actor.id, "submit this rating"));
        }
        if rating.is_submitted() {
            return Err(ServiceError::Validation(
                "This rating has already been submitted".to_string(),
            ));
        }
        if !(1..=5).contains(&stars) {
            return Err(ServiceError::Validation(
                "Stars must be between 1 and 5".to_string(),
            ));
        }

        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if comment
            .as_ref()
            .map_or(false, |c| c.chars().count() > MAX_COMMENT_CHARS)
        {
            return Err(ServiceError::Validation(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        match self
            .store
            .submit_rating(rating_id, actor.id, stars, comment, now)
            .await?
        {
            Some(RatingSubmission::Stored(stored)) => {
                self.summary_cache.invalidate(&stored.ratee_id);
                tracing::info!("Rating {} submitted with {} stars", stored.id, stars);
                Ok(stored)
            }
            Some(RatingSubmission::AlreadySubmitted(_)) => {
                tracing::warn!("Rating {} was submitted concurrently", rating_id);
                Err(ServiceError::Validation(
                    "This rating has already been submitted".to_string(),
                ))
            }
            Some(RatingSubmission::WrongRater(_)) => {
                Err(ServiceError::unauthorized(actor.id, "submit this rating"))
            }
            None => Err(ServiceError::RatingNotFound(rating_id)),
        }
    }

    pub async fn ratings_for(&self, ratee_id: Uuid) -> Result<Vec<Rating>, ServiceError> {
        Ok(self.store.list_submitted_ratings_for(ratee_id).await?)
    }

    pub async fn summary_for(&self, ratee_id: Uuid) -> Result<RatingSummary, ServiceError> {
        if let Some(summary) = self.summary_cache.get(&ratee_id) {
            return Ok(summary);
        }

        let summary = self.store.rating_summary_for(ratee_id).await?;
        self.summary_cache.insert(ratee_id, summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn service() -> RatingService {
        RatingService::new(
            Arc::new(MemoryStore::new()),
            "https://oddjobs.test/",
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_link_url_format() {
        let service = service();
        let id = Uuid::new_v4();
        assert_eq!(service.link_url(id), format!("https://oddjobs.test/rate/{}", id));
    }

    #[tokio::test]
    async fn test_submit_once_by_rater_only() {
        let service = service();
        let now = Utc::now();
        let (job, worker, employer) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let rating = service.create_link(job, worker, employer, now).await.unwrap();
        assert_eq!(service.resolve(rating.id).await.unwrap().stars, None);

        let stranger = Actor::worker(Uuid::new_v4());
        let err = service
            .submit(rating.id, &stranger, 5, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized { .. }));

        let rater = Actor::worker(worker);
        let err = service.submit(rating.id, &rater, 6, None, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = service
            .submit(rating.id, &rater, 4, Some("  on time  ".into()), now)
            .await
            .unwrap();
        assert_eq!(stored.stars, Some(4));
        assert_eq!(stored.comment.as_deref(), Some("on time"));

        let err = service.submit(rating.id, &rater, 3, None, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_comment_length_limit() {
        let service = service();
        let now = Utc::now();
        let worker = Uuid::new_v4();
        let rating = service
            .create_link(Uuid::new_v4(), worker, Uuid::new_v4(), now)
            .await
            .unwrap();

        let long = "a".repeat(MAX_COMMENT_CHARS + 1);
        let err = service
            .submit(rating.id, &Actor::worker(worker), 5, Some(long), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_summary_refreshes_after_submission() {
        let service = service();
        let now = Utc::now();
        let employer = Uuid::new_v4();

        assert_eq!(service.summary_for(employer).await.unwrap(), RatingSummary::default());

        let first = Uuid::new_v4();
        let rating = service.create_link(Uuid::new_v4(), first, employer, now).await.unwrap();
        service
            .submit(rating.id, &Actor::worker(first), 5, None, now)
            .await
            .unwrap();

        let second = Uuid::new_v4();
        let rating = service.create_link(Uuid::new_v4(), second, employer, now).await.unwrap();
        service
            .submit(rating.id, &Actor::worker(second), 2, None, now)
            .await
            .unwrap();

        let summary = service.summary_for(employer).await.unwrap();
        assert_eq!(summary.ratings_count, 2);
        assert_eq!(summary.average_stars, Some(3.5));
        assert_eq!(service.ratings_for(employer).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_unknown_rating() {
        let err = service().resolve(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::RatingNotFound(_)));
    }
}
