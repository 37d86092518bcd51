// handler/jobs.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{jobdtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::{
        error::ServiceError,
        geocoding_service::resolve_place,
        lifecycle_service::{JobDraft, JobLocationInput},
    },
    utils::geo::GeoPoint,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route("/", post(create_job))
        .route("/nearby", get(find_nearby_jobs))
        .route("/nearby/me", get(find_jobs_near_me))
        .route("/mine", get(get_my_jobs))
        .route("/:job_id", get(get_job))
        .route("/:job_id/claim", post(claim_job))
        .route("/:job_id/transition", post(transition_job))
}

pub async fn find_nearby_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<NearbyJobsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let radius = query.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M);
    let jobs = app_state
        .proximity_service
        .find_nearby(GeoPoint::new(query.lat, query.lon), radius, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Nearby jobs retrieved successfully", jobs)))
}

pub async fn find_jobs_near_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<WorkerNearbyQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let radius = query.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M);
    let jobs = app_state
        .proximity_service
        .find_nearby_for_worker(auth.actor.id, radius, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Nearby jobs retrieved successfully", jobs)))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let work_window = match (body.work_start, body.work_end) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(HttpError::bad_request(
                "Work start and end must be given together",
            ))
        }
    };

    let location = match (body.location_id, body.latitude, body.longitude) {
        (Some(location_id), _, _) => JobLocationInput::Saved(location_id),
        (None, Some(lat), Some(lon)) => JobLocationInput::Explicit {
            point: GeoPoint::new(lat, lon),
            address: body.address.clone(),
        },
        (None, None, None) => {
            let address = body.address.as_deref().unwrap_or_default();
            if address.trim().is_empty() {
                return Err(HttpError::bad_request(
                    "A saved location, coordinates or an address is required",
                ));
            }
            let place = resolve_place(app_state.geocoder.as_ref(), address, None)
                .await
                .map_err(ServiceError::from)?;
            JobLocationInput::Explicit {
                point: place.point,
                address: Some(place.address),
            }
        }
        _ => {
            return Err(HttpError::bad_request(
                "Latitude and longitude must be given together",
            ))
        }
    };

    let draft = JobDraft {
        title: body.title,
        description: body.description,
        location,
        compensation: body.compensation,
        payment_method: body.payment_method,
        approx_duration: body.approx_duration,
        due_by: body.due_by,
        tools: body.tools,
        work_window,
    };

    let job = app_state
        .lifecycle_service
        .post_job(&auth.actor, draft, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Job posted successfully", job)))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .lifecycle_service
        .list_employer_jobs(auth.actor.id)
        .await?;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.lifecycle_service.get_job(job_id).await?;

    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

pub async fn claim_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .lifecycle_service
        .claim(&auth.actor, job_id, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Job claimed successfully", job)))
}

pub async fn transition_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<TransitionJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .lifecycle_service
        .transition(&auth.actor, job_id, body.action, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Job updated successfully", outcome)))
}
