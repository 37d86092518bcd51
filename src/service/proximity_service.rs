// service/proximity_service.rs
use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::JobStore,
    models::{jobmodel::Job, ratingmodel::RatingSummary},
    service::{error::ServiceError, rating_service::RatingService},
    utils::geo::{BoundingBox, GeoPoint},
};

#[derive(Debug, Clone, Serialize)]
pub struct NearbyJob {
    pub job: Job,
    pub distance_meters: f64,
    pub employer_rating: RatingSummary,
}

#[derive(Debug, Clone)]
pub struct ProximityService {
    store: Arc<dyn JobStore>,
    ratings: Arc<RatingService>,
    max_radius_m: f64,
}

impl ProximityService {
    pub fn new(store: Arc<dyn JobStore>, ratings: Arc<RatingService>, max_radius_m: f64) -> Self {
        Self {
            store,
            ratings,
            max_radius_m,
        }
    }

    /// Open jobs within `radius_m` of `point`, nearest first. Equal distances
    /// are ordered by posting time, oldest first.
    pub async fn find_nearby(
        &self,
        point: GeoPoint,
        radius_m: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbyJob>, ServiceError> {
        if !point.is_valid() {
            return Err(ServiceError::Validation(
                "Coordinates are out of range".to_string(),
            ));
        }
        if !radius_m.is_finite() || radius_m <= 0.0 || radius_m > self.max_radius_m {
            return Err(ServiceError::Validation(format!(
                "Radius must be greater than 0 and at most {} meters",
                self.max_radius_m
            )));
        }

        let candidates = self
            .store
            .find_open_jobs_in_box(BoundingBox::around(point, radius_m), now)
            .await?;
        let scanned = candidates.len();

        let mut hits: Vec<(Job, f64)> = candidates
            .into_iter()
            .filter(|job| job.is_open(now))
            .map(|job| {
                let distance = point.distance_to(&job.point());
                (job, distance)
            })
            .filter(|(_, distance)| *distance <= radius_m)
            .collect();

        hits.sort_by(|(a, da), (b, db)| {
            da.total_cmp(db)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::debug!(
            "Nearby search at ({}, {}) r={}m: {} candidates, {} in range",
            point.lat,
            point.lon,
            radius_m,
            scanned,
            hits.len()
        );

        let mut summaries: HashMap<Uuid, RatingSummary> = HashMap::new();
        let mut results = Vec::with_capacity(hits.len());
        for (job, distance_meters) in hits {
            let employer_rating = match summaries.get(&job.employer_id) {
                Some(summary) => *summary,
                None => {
                    let summary = self.ratings.summary_for(job.employer_id).await?;
                    summaries.insert(job.employer_id, summary);
                    summary
                }
            };
            results.push(NearbyJob {
                job,
                distance_meters,
                employer_rating,
            });
        }

        Ok(results)
    }

    /// Same search centred on the worker's registered location.
    pub async fn find_nearby_for_worker(
        &self,
        worker_id: Uuid,
        radius_m: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbyJob>, ServiceError> {
        let location = self
            .store
            .get_worker_location(worker_id)
            .await?
            .ok_or(ServiceError::WorkerLocationNotFound(worker_id))?;

        self.find_nearby(location.point(), radius_m, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{jobdb::JobExt, locationdb::LocationExt, memory::MemoryStore},
        models::{jobmodel::*, locationmodel::*},
    };
    use chrono::Duration;
    use sqlx::types::BigDecimal;

    const CENTER: GeoPoint = GeoPoint { lat: 44.9778, lon: -93.2650 };
    // Meters per degree of latitude on the mean-radius sphere
    const M_PER_DEG: f64 = 111_194.93;

    fn setup() -> (Arc<MemoryStore>, ProximityService) {
        let store = Arc::new(MemoryStore::new());
        let ratings = Arc::new(RatingService::new(
            store.clone(),
            "http://localhost",
            std::time::Duration::from_secs(60),
        ));
        let service = ProximityService::new(store.clone(), ratings, 500_000.0);
        (store, service)
    }

    async fn post_north(store: &MemoryStore, meters: f64, created_at: DateTime<Utc>) -> Job {
        store
            .insert_job(NewJob {
                employer_id: Uuid::new_v4(),
                title: format!("{}m north", meters),
                description: "test".into(),
                point: GeoPoint::new(CENTER.lat + meters / M_PER_DEG, CENTER.lon),
                address: None,
                compensation: BigDecimal::from(25),
                payment_method: "cash".into(),
                approx_duration: None,
                due_by: None,
                tools: None,
                work_window: None,
                created_at,
                expires_at: created_at + Duration::days(7),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_results_sorted_and_bounded() {
        let (store, service) = setup();
        let now = Utc::now();

        let far = post_north(&store, 900.0, now).await;
        let near = post_north(&store, 200.0, now).await;
        let mid = post_north(&store, 450.0, now).await;
        post_north(&store, 1_500.0, now).await;

        let results = service.find_nearby(CENTER, 1_000.0, now).await.unwrap();
        let ids: Vec<Uuid> = results.iter().map(|r| r.job.id).collect();
        assert_eq!(ids, vec![near.id, mid.id, far.id]);

        for pair in results.windows(2) {
            assert!(pair[0].distance_meters <= pair[1].distance_meters);
        }
        assert!(results.iter().all(|r| r.distance_meters <= 1_000.0));
        assert!((results[0].distance_meters - 200.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn test_equal_distance_ties_by_posting_time() {
        let (store, service) = setup();
        let now = Utc::now();

        let newer = post_north(&store, 300.0, now).await;
        let older = post_north(&store, 300.0, now - Duration::hours(1)).await;

        let results = service.find_nearby(CENTER, 500.0, now).await.unwrap();
        let ids: Vec<Uuid> = results.iter().map(|r| r.job.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn test_only_open_jobs_are_listed() {
        let (store, service) = setup();
        let now = Utc::now();

        let open = post_north(&store, 100.0, now).await;
        let claimed = post_north(&store, 150.0, now).await;
        store
            .transition_job(
                StatusTransition::new(claimed.id, JobStatus::Posted, JobStatus::Claimed, now)
                    .with_claim(ClaimChange::Set(Uuid::new_v4())),
            )
            .await
            .unwrap()
            .unwrap();
        // Posted long enough ago that its expiry has passed
        post_north(&store, 120.0, now - Duration::days(8)).await;

        let results = service.find_nearby(CENTER, 500.0, now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].job.id, open.id);
    }

    #[tokio::test]
    async fn test_empty_area_is_not_an_error() {
        let (_, service) = setup();
        let results = service.find_nearby(CENTER, 100.0, Utc::now()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_invalid_radius_and_point() {
        let (_, service) = setup();
        let now = Utc::now();

        for radius in [0.0, -5.0, f64::NAN, f64::INFINITY, 500_001.0] {
            let err = service.find_nearby(CENTER, radius, now).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "radius {}", radius);
        }

        let err = service
            .find_nearby(GeoPoint::new(0.0, 200.0), 1_000.0, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_from_worker_location() {
        let (store, service) = setup();
        let now = Utc::now();
        let worker = Uuid::new_v4();

        let err = service
            .find_nearby_for_worker(worker, 1_000.0, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WorkerLocationNotFound(_)));

        store
            .replace_worker_location(
                NewLocation {
                    owner_id: worker,
                    kind: LocationKind::Worker,
                    address: "downtown".into(),
                    point: CENTER,
                    verified: true,
                    at: now,
                },
                now - Duration::hours(24),
            )
            .await
            .unwrap();
        let job = post_north(&store, 250.0, now).await;

        let results = service.find_nearby_for_worker(worker, 1_000.0, now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].job.id, job.id);
        assert_eq!(results[0].employer_rating, RatingSummary::default());
    }
}
