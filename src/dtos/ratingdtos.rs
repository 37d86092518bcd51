use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ratingmodel::{Rating, RatingSummary};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitRatingDto {
    pub stars: i32,

    #[validate(length(max = 1000, message = "Comment must be at most 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserRatingsDto {
    pub summary: RatingSummary,
    pub ratings: Vec<Rating>,
}
