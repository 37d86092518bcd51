// handler/locations.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{locationdtos::LocationDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::{
        error::ServiceError,
        geocoding_service::{resolve_place, ResolvedPlace},
    },
    AppState,
};

pub fn locations_handler() -> Router {
    Router::new()
        .route("/", get(list_my_locations).post(add_employer_location))
        .route("/worker", get(get_worker_location).put(set_worker_location))
        .route("/:location_id", delete(delete_employer_location))
}

async fn resolve_body(app_state: &AppState, body: &LocationDto) -> Result<ResolvedPlace, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let point = body.point().map_err(HttpError::bad_request)?;

    let place = resolve_place(app_state.geocoder.as_ref(), &body.address, point)
        .await
        .map_err(ServiceError::from)?;
    Ok(place)
}

pub async fn set_worker_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<LocationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let place = resolve_body(&app_state, &body).await?;

    let location = app_state
        .location_service
        .set_worker_location(&auth.actor, place, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Location updated successfully", location)))
}

pub async fn get_worker_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let location = app_state
        .location_service
        .get_worker_location(auth.actor.id)
        .await?;

    Ok(Json(ApiResponse::success("Location retrieved successfully", location)))
}

pub async fn add_employer_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<LocationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let place = resolve_body(&app_state, &body).await?;

    let location = app_state
        .location_service
        .add_location(&auth.actor, place, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Location saved successfully", location)))
}

pub async fn list_my_locations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let locations = app_state
        .location_service
        .list_locations(auth.actor.id)
        .await?;

    Ok(Json(ApiResponse::success("Locations retrieved successfully", locations)))
}

pub async fn delete_employer_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(location_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .location_service
        .delete_location(&auth.actor, location_id)
        .await?;

    Ok(Json(ApiResponse::success("Location deleted successfully", location_id)))
}
