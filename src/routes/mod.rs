//! HTTP route handlers for the spotbook API.
//!
//! - `spots`: listing, detail, create/update/delete, spot images
//! - `reviews`: reviews of a spot, the caller's reviews, review images
//! - `bookings`: bookings of a spot, the caller's bookings
//! - `session`: sign-up, login, current session
//! - `health`: liveness, readiness, metrics and version

pub mod bookings;
pub mod health;
pub mod reviews;
pub mod session;
pub mod spots;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

async fn not_found() -> AppError {
    AppError::NotFound("The requested resource couldn't be found.".to_string())
}

/// Builds the full application router. Shared by the binary and the tests.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/spots", get(spots::list_spots).post(spots::create_spot))
        .route("/spots/current", get(spots::current_spots))
        .route("/spots/{id}", get(spots::get_spot).put(spots::update_spot).delete(spots::delete_spot))
        .route("/spots/{id}/images", post(spots::add_spot_image))
        .route("/spots/{id}/reviews", get(reviews::spot_reviews).post(reviews::create_review))
        .route("/spots/{id}/bookings", get(bookings::spot_bookings).post(bookings::create_booking))
        .route("/reviews/current", get(reviews::current_reviews))
        .route("/reviews/{id}/images", post(reviews::add_review_image))
        .route("/bookings/current", get(bookings::current_bookings))
        .route("/users", post(session::signup))
        .route(
            "/session",
            get(session::current_session).post(session::login).delete(session::logout),
        )
        .layer(from_fn_with_state(state.clone(), middleware::auth::restore_user));

    let cfg = state.config.clone();
    let app = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn_with_state(cfg.clone(), middleware::errors::debug_errors))
        .layer(from_fn_with_state(state, middleware::rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, middleware::security_headers::security_headers_middleware));

    // Permissive CORS only for local development against a separate frontend.
    if cfg!(debug_assertions) {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

