use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    booking::{authorize_spot_mutation, compute_average_rating, compute_average_ratings},
    error::{AppResult, OptionExt},
    middleware::auth::AuthUser,
    middleware::validation::{validate_spot, validate_spot_image, validate_spot_query, AppJson, AppPath, AppQuery},
    state::AppState,
    store::SpotStore,
    types::{Spot, SpotDetail, SpotImage, SpotImageRequest, SpotListItem, SpotListQuery, SpotListResponse, SpotRequest},
};

/// Decorates spots with their list-view rating (`null` when unreviewed) and preview image.
async fn list_items(store: &dyn SpotStore, spots: Vec<Spot>) -> AppResult<Vec<SpotListItem>> {
    let ids: Vec<i64> = spots.iter().map(|s| s.id).collect();
    let mut ratings = compute_average_ratings(store, &ids).await?;
    let mut previews = store.preview_images_for_spots(&ids).await?;
    Ok(spots
        .into_iter()
        .map(|spot| {
            let avg_rating = ratings.remove(&spot.id).flatten();
            let preview_image = previews.remove(&spot.id);
            SpotListItem { spot, avg_rating, preview_image }
        })
        .collect())
}

pub async fn list_spots(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SpotListQuery>,
) -> AppResult<Json<SpotListResponse>> {
    let (filter, page) = validate_spot_query(&query, &state.config.pagination)?;
    let spots = state.store.list_spots(&filter, page).await?;
    let spots = list_items(state.store.as_ref(), spots).await?;
    Ok(Json(SpotListResponse { spots, page: Some(page.page), size: Some(page.size) }))
}

pub async fn current_spots(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<SpotListResponse>> {
    let spots = state.store.list_spots_by_owner(user.id()).await?;
    let spots = list_items(state.store.as_ref(), spots).await?;
    Ok(Json(SpotListResponse { spots, page: None, size: None }))
}

pub async fn get_spot(State(state): State<AppState>, AppPath(spot_id): AppPath<i64>) -> AppResult<Json<SpotDetail>> {
    let store = state.store.as_ref();
    let spot = store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;

    let rating = compute_average_rating(store, spot_id).await?;
    // Detail view reports 0 rather than null for an unreviewed spot.
    let avg_star_rating = rating.average.unwrap_or(0.0);
    let spot_images = store.list_spot_images(spot_id).await?;
    let owner = store.find_user_summary(spot.owner_id).await?.ok_or_not_found("Owner")?;

    Ok(Json(SpotDetail { spot, num_reviews: rating.num_reviews, avg_star_rating, spot_images, owner }))
}

pub async fn create_spot(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<SpotRequest>,
) -> AppResult<(StatusCode, Json<Spot>)> {
    let input = validate_spot(req)?;
    let spot = state.store.create_spot(user.id(), &input).await?;
    state.metrics.inc_spots_created();
    tracing::info!(spot_id = spot.id, user_id = user.id(), "spot created");
    Ok((StatusCode::CREATED, Json(spot)))
}

pub async fn update_spot(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
    AppJson(req): AppJson<SpotRequest>,
) -> AppResult<Json<Spot>> {
    let input = validate_spot(req)?;
    let spot = state.store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;
    authorize_spot_mutation(&spot, user.id())?;

    let updated = state.store.update_spot(spot_id, &input).await?;
    tracing::info!(spot_id, user_id = user.id(), "spot updated");
    Ok(Json(updated))
}

pub async fn delete_spot(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
) -> AppResult<Json<Value>> {
    let spot = state.store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;
    authorize_spot_mutation(&spot, user.id())?;

    state.store.delete_spot(spot_id).await?;
    state.metrics.inc_spots_deleted();
    tracing::info!(spot_id, user_id = user.id(), "spot deleted");
    Ok(Json(json!({ "message": "Successfully deleted" })))
}

pub async fn add_spot_image(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
    AppJson(req): AppJson<SpotImageRequest>,
) -> AppResult<(StatusCode, Json<SpotImage>)> {
    let (url, preview) = validate_spot_image(req)?;
    let spot = state.store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;
    authorize_spot_mutation(&spot, user.id())?;

    let image = state.store.create_spot_image(spot_id, &url, preview).await?;
    state.metrics.inc_images_uploaded();
    Ok((StatusCode::CREATED, Json(image)))
}
