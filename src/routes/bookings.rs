use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    booking::{list_bookings_for_spot, validate_booking_request},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    middleware::ip::ClientIp,
    middleware::validation::{validate_booking_dates, AppJson, AppPath},
    state::{AppState, BOOKING_LIMIT_KEY},
    types::{Booking, BookingRequest, BookingView, BookingWithSpot},
};

#[derive(Debug, Serialize)]
pub struct BookingsResponse<T> {
    #[serde(rename = "Bookings")]
    pub bookings: Vec<T>,
}

pub async fn spot_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
) -> AppResult<Json<BookingsResponse<BookingView>>> {
    let bookings = list_bookings_for_spot(state.store.as_ref(), spot_id, user.id()).await?;
    Ok(Json(BookingsResponse { bookings }))
}

pub async fn current_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<BookingsResponse<BookingWithSpot>>> {
    let bookings = state.store.list_bookings_by_user(user.id()).await?;
    Ok(Json(BookingsResponse { bookings }))
}

pub async fn create_booking(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    user: AuthUser,
    AppPath(spot_id): AppPath<i64>,
    AppJson(req): AppJson<BookingRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    state.rate_limiter.check_endpoint_limit(BOOKING_LIMIT_KEY, ip).await?;
    let (start, end) = validate_booking_dates(&req)?;

    match validate_booking_request(state.store.as_ref(), spot_id, user.id(), start, end).await {
        Ok(booking) => {
            state.metrics.inc_bookings_created();
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(e) => {
            if matches!(e, AppError::Forbidden(_) | AppError::Conflict { .. }) {
                state.metrics.inc_bookings_rejected();
            }
            Err(e)
        }
    }
}
