// handler/ratings.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{ratingdtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn ratings_handler() -> Router {
    Router::new()
        .route("/:rating_id", get(resolve_rating).post(submit_rating))
        .route("/users/:user_id", get(get_user_ratings))
}

pub async fn resolve_rating(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(rating_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let rating = app_state.rating_service.resolve(rating_id).await?;

    Ok(Json(ApiResponse::success("Rating retrieved successfully", rating)))
}

pub async fn submit_rating(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(rating_id): Path<Uuid>,
    Json(body): Json<SubmitRatingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let rating = app_state
        .rating_service
        .submit(rating_id, &auth.actor, body.stars, body.comment, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success("Rating submitted successfully", rating)))
}

pub async fn get_user_ratings(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let summary = app_state.rating_service.summary_for(user_id).await?;
    let ratings = app_state.rating_service.ratings_for(user_id).await?;

    Ok(Json(ApiResponse::success(
        "Ratings retrieved successfully",
        UserRatingsDto { summary, ratings },
    )))
}
