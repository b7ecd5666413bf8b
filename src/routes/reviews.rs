use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    booking::{authorize_review_mutation, validate_review_request},
    error::{AppError, AppResult, OptionExt},
    middleware::auth::AuthUser,
    middleware::validation::{validate_review, validate_review_image, AppJson, AppPath},
    state::AppState,
    types::{Review, ReviewDetail, ReviewImage, ReviewImageRequest, ReviewRequest},
};

pub const MAX_REVIEW_IMAGES: i64 = 10;

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    #[serde(rename = "Reviews")]
    pub reviews: Vec<ReviewDetail>,
}

pub async fn spot_reviews(
    State(state): State<AppState>,
    AppPath(spot_id): AppPath<i64>,
) -> AppResult<Json<ReviewsResponse>> {
    state.store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;
    let reviews = state.store.list_reviews_by_spot(spot_id).await?;
    Ok(Json(ReviewsResponse { reviews }))
}

pub async fn current_reviews(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ReviewsResponse>> {
    let reviews = state.store.list_reviews_by_user(user.id()).await?;
    Ok(Json(ReviewsResponse { reviews }))
}

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
    AppJson(req): AppJson<ReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let (text, stars) = validate_review(req)?;
    match validate_review_request(state.store.as_ref(), spot_id, user.id(), stars, &text).await {
        Ok(review) => {
            state.metrics.inc_reviews_created();
            Ok((StatusCode::CREATED, Json(review)))
        }
        Err(e) => {
            if matches!(e, AppError::Forbidden(_) | AppError::Conflict { .. }) {
                state.metrics.inc_reviews_rejected();
            }
            Err(e)
        }
    }
}

pub async fn add_review_image(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(review_id): AppPath<i64>,
    AppJson(req): AppJson<ReviewImageRequest>,
) -> AppResult<(StatusCode, Json<ReviewImage>)> {
    let url = validate_review_image(req)?;
    let review = state.store.find_review_by_id(review_id).await?.ok_or_not_found("Review")?;
    authorize_review_mutation(&review, user.id())?;

    if state.store.count_review_images(review_id).await? >= MAX_REVIEW_IMAGES {
        return Err(AppError::Forbidden("Maximum number of images for this resource was reached".to_string()));
    }

    let image = state.store.create_review_image(review_id, &url).await?;
    state.metrics.inc_images_uploaded();
    Ok((StatusCode::CREATED, Json(image)))
}
