// db/pg_tests.rs
//! Conditional writes against a real Postgres. Each test skips itself when
//! `DATABASE_URL` is not set.
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::{postgres::PgPoolOptions, types::BigDecimal};
use uuid::Uuid;

use super::{jobdb::JobExt, locationdb::LocationExt, ratingdb::RatingExt, DBClient};
use crate::{
    models::{jobmodel::*, locationmodel::*, ratingmodel::*},
    utils::geo::GeoPoint,
};

async fn client() -> Option<DBClient> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(DBClient::new(pool))
}

// Postgres keeps microseconds
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn new_job(employer_id: Uuid, at: DateTime<Utc>) -> NewJob {
    NewJob {
        employer_id,
        title: "Paint shed".to_string(),
        description: "One coat, paint provided".to_string(),
        point: GeoPoint::new(44.95, -93.10),
        address: Some("9 Birch Ln".to_string()),
        compensation: BigDecimal::from(60),
        payment_method: "cash".to_string(),
        approx_duration: None,
        due_by: None,
        tools: None,
        work_window: None,
        created_at: at,
        expires_at: at + Duration::days(7),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claim_update_has_one_winner() {
    let Some(db) = client().await else { return };
    let db = Arc::new(db);
    let at = now();
    let job = db.insert_job(new_job(Uuid::new_v4(), at)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let worker = Uuid::new_v4();
        handles.push(tokio::spawn(async move {
            let claim = StatusTransition::new(job.id, JobStatus::Posted, JobStatus::Claimed, at)
                .with_claim(ClaimChange::Set(worker));
            db.transition_job(claim).await.map(|won| won.map(|job| (worker, job)))
        }));
    }

    let mut winners = Vec::new();
    for joined in futures::future::join_all(handles).await {
        if let Some(won) = joined.unwrap().unwrap() {
            winners.push(won);
        }
    }
    assert_eq!(winners.len(), 1);
    let (worker, claimed) = &winners[0];
    assert_eq!(claimed.status, JobStatus::Claimed);
    assert_eq!(claimed.claimed_by, Some(*worker));
    assert_eq!(claimed.claimed_at, Some(at));

    // Cancel clears the claimant in the same statement
    let cancel = StatusTransition::new(job.id, JobStatus::Claimed, JobStatus::Cancelled, at)
        .owned_by(job.employer_id)
        .with_claim(ClaimChange::Clear);
    let cancelled = db.transition_job(cancel).await.unwrap().unwrap();
    assert_eq!(cancelled.claimed_by, None);
    assert_eq!(cancelled.claimed_at, None);
}

#[tokio::test]
async fn test_completion_writes_rating_in_the_same_transaction() {
    let Some(db) = client().await else { return };
    let at = now();
    let employer = Uuid::new_v4();
    let worker = Uuid::new_v4();
    let job = db.insert_job(new_job(employer, at)).await.unwrap();

    let claim = StatusTransition::new(job.id, JobStatus::Posted, JobStatus::Claimed, at)
        .with_claim(ClaimChange::Set(worker));
    db.transition_job(claim).await.unwrap().unwrap();

    // Wrong starting status: neither the job nor the ratings change
    let early = StatusTransition::new(job.id, JobStatus::InProgress, JobStatus::WorkerDone, at)
        .claimed_by(worker)
        .requesting_rating(worker, employer);
    assert!(db.transition_job(early).await.unwrap().is_none());
    let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE job_id = $1")
        .bind(job.id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(pending, 0);

    let start = StatusTransition::new(job.id, JobStatus::Claimed, JobStatus::InProgress, at)
        .claimed_by(worker);
    db.transition_job(start).await.unwrap().unwrap();

    let done = StatusTransition::new(job.id, JobStatus::InProgress, JobStatus::WorkerDone, at)
        .claimed_by(worker)
        .requesting_rating(worker, employer);
    let updated = db.transition_job(done).await.unwrap().unwrap();
    assert_eq!(updated.status, JobStatus::WorkerDone);

    let rating = db.create_pending_rating(job.id, worker, employer, at + Duration::hours(1)).await.unwrap();
    assert_eq!(rating.created_at, at);
    assert_eq!(rating.stars, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_relocation_upsert_has_one_winner() {
    let Some(db) = client().await else { return };
    let db = Arc::new(db);
    let worker = Uuid::new_v4();
    let t0 = now();

    for at in [t0, t0 + Duration::hours(25)] {
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let location = NewLocation {
                    owner_id: worker,
                    kind: LocationKind::Worker,
                    address: format!("{} Elm St", i),
                    point: GeoPoint::new(44.9 + i as f64 * 0.01, -93.2),
                    verified: false,
                    at,
                };
                db.replace_worker_location(location, at - Duration::hours(24)).await
            }));
        }

        let mut written = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined.unwrap().unwrap() {
                Relocation::Written(location) => written.push(location),
                Relocation::TooSoon(current) => assert_eq!(current.updated_at, at),
            }
        }
        assert_eq!(written.len(), 1);

        let stored = db.list_locations(worker).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].address, written[0].address);
        assert_eq!(stored[0].updated_at, at);
    }
}

#[tokio::test]
async fn test_rating_create_and_submit_are_conditional() {
    let Some(db) = client().await else { return };
    let at = now();
    let (rater, ratee) = (Uuid::new_v4(), Uuid::new_v4());
    let job = db.insert_job(new_job(ratee, at)).await.unwrap();

    let first = db.create_pending_rating(job.id, rater, ratee, at).await.unwrap();
    let second = db.create_pending_rating(job.id, rater, ratee, at).await.unwrap();
    assert_eq!(first.id, second.id);

    let stranger = db
        .submit_rating(first.id, Uuid::new_v4(), 4, None, at)
        .await
        .unwrap();
    assert!(matches!(stranger, Some(RatingSubmission::WrongRater(_))));

    let stored = db
        .submit_rating(first.id, rater, 4, Some("tidy work".to_string()), at)
        .await
        .unwrap();
    assert!(matches!(stored, Some(RatingSubmission::Stored(ref r)) if r.stars == Some(4)));

    let again = db.submit_rating(first.id, rater, 1, None, at).await.unwrap();
    match again {
        Some(RatingSubmission::AlreadySubmitted(rating)) => assert_eq!(rating.stars, Some(4)),
        other => panic!("expected AlreadySubmitted, got {:?}", other),
    }

    assert!(db.submit_rating(Uuid::new_v4(), rater, 4, None, at).await.unwrap().is_none());
}
