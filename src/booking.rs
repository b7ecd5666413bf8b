//! Booking and authorization rules.
//!
//! Every function here takes the persistence gateway explicitly and loads
//! fresh data for each call. Checks run in a fixed order and the first
//! failing one is returned; nothing after it executes.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{booking_overlap, AppError, AppResult, OptionExt};
use crate::store::SpotStore;
use crate::types::{Booking, BookingView, NewBooking, NewReview, Review, Spot};

/// Only the owner may edit, delete or attach images to a spot.
pub fn authorize_spot_mutation(spot: &Spot, user_id: i64) -> AppResult<()> {
    if spot.owner_id == user_id {
        Ok(())
    } else {
        warn!(spot_id = spot.id, user_id, "spot mutation by non-owner rejected");
        Err(AppError::Forbidden("Forbidden".to_string()))
    }
}

/// Only the author may attach images to a review.
pub fn authorize_review_mutation(review: &Review, user_id: i64) -> AppResult<()> {
    if review.user_id == user_id {
        Ok(())
    } else {
        warn!(review_id = review.id, user_id, "review mutation by non-author rejected");
        Err(AppError::Forbidden("Forbidden".to_string()))
    }
}

/// True when either proposed endpoint falls inside the existing range, bounds inclusive.
pub fn ranges_conflict(existing_start: NaiveDate, existing_end: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    let within = |d: NaiveDate| existing_start <= d && d <= existing_end;
    within(start) || within(end)
}

/// Books `[start, end]` on a spot for `user_id`.
///
/// `start < end` must already be validated. Rejects with 404 for an unknown
/// spot, 403 when the owner tries to book, and a conflict when the range hits
/// an existing booking of the spot.
pub async fn validate_booking_request(
    store: &dyn SpotStore,
    spot_id: i64,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Booking> {
    let spot = store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;

    if spot.owner_id == user_id {
        warn!(spot_id, user_id, "owner tried to book own spot");
        return Err(AppError::Forbidden("Spot owner cannot book their own spot".to_string()));
    }

    let existing = store.list_bookings_by_spot(spot_id).await?;
    if let Some(clash) = existing.iter().find(|b| ranges_conflict(b.start_date, b.end_date, start, end)) {
        info!(spot_id, user_id, conflicting_booking = clash.id, %start, %end, "booking dates conflict");
        return Err(booking_overlap());
    }

    let booking = store.create_booking(&NewBooking { spot_id, user_id, start_date: start, end_date: end }).await?;
    info!(spot_id, user_id, booking_id = booking.id, %start, %end, "booking created");
    Ok(booking)
}

/// Creates the caller's review of a spot. `stars` must already be within 1..=5.
pub async fn validate_review_request(
    store: &dyn SpotStore,
    spot_id: i64,
    user_id: i64,
    stars: i64,
    text: &str,
) -> AppResult<Review> {
    let spot = store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;

    if spot.owner_id == user_id {
        warn!(spot_id, user_id, "owner tried to review own spot");
        return Err(AppError::Forbidden("Spot owner cannot review their own spot".to_string()));
    }

    if store.find_review_by_spot_and_user(spot_id, user_id).await?.is_some() {
        info!(spot_id, user_id, "duplicate review rejected");
        return Err(AppError::conflict("User already has a review for this spot"));
    }

    let review = store
        .create_review(&NewReview { spot_id, user_id, review: text.to_string(), stars })
        .await
        .map_err(|e| match e {
            // Lost a race against a concurrent review by the same user.
            AppError::Conflict { .. } => AppError::conflict("User already has a review for this spot"),
            other => other,
        })?;
    info!(spot_id, user_id, review_id = review.id, stars, "review created");
    Ok(review)
}

/// Review count and mean star rating of one spot, from a single read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub num_reviews: i64,
    /// `None` when nobody reviewed the spot yet.
    pub average: Option<f64>,
}

/// Mean star rating of a spot together with its review count.
///
/// Callers pick the "no reviews" sentinel: list views serialize `None` as
/// `null`, the detail view shows `0`.
pub async fn compute_average_rating(store: &dyn SpotStore, spot_id: i64) -> AppResult<RatingSummary> {
    let stars = store.review_stars_by_spot(spot_id).await?;
    Ok(RatingSummary { num_reviews: i64::try_from(stars.len()).unwrap_or(i64::MAX), average: average(&stars) })
}

/// Mean star rating of each spot in `spot_ids`, read with one query.
/// Every requested id is present in the result.
pub async fn compute_average_ratings(store: &dyn SpotStore, spot_ids: &[i64]) -> AppResult<HashMap<i64, Option<f64>>> {
    let mut stars = store.review_stars_for_spots(spot_ids).await?;
    Ok(spot_ids
        .iter()
        .map(|id| (*id, stars.remove(id).and_then(|s| average(&s))))
        .collect())
}

pub(crate) fn average(stars: &[i64]) -> Option<f64> {
    if stars.is_empty() {
        return None;
    }
    let sum: i64 = stars.iter().sum();
    Some(sum as f64 / stars.len() as f64)
}

/// Bookings of a spot as `user_id` may see them.
///
/// The owner gets full records with each booker's name; anyone else only
/// learns which dates are taken.
pub async fn list_bookings_for_spot(store: &dyn SpotStore, spot_id: i64, user_id: i64) -> AppResult<Vec<BookingView>> {
    let spot = store.find_spot_by_id(spot_id).await?.ok_or_not_found("Spot")?;

    if spot.owner_id == user_id {
        let bookings = store.list_bookings_with_guests(spot_id).await?;
        return Ok(bookings.into_iter().map(|(booking, user)| BookingView::Owner { user, booking }).collect());
    }

    let bookings = store.list_bookings_by_spot(spot_id).await?;
    Ok(bookings
        .into_iter()
        .map(|b| BookingView::Public { spot_id: b.spot_id, start_date: b.start_date, end_date: b.end_date })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_conflict_on_shared_endpoints() {
        let (a, b) = (d("2024-06-01"), d("2024-06-05"));
        // start inside
        assert!(ranges_conflict(a, b, d("2024-06-04"), d("2024-06-10")));
        // end inside
        assert!(ranges_conflict(a, b, d("2024-05-25"), d("2024-06-01")));
        // touching at the existing end is still a conflict (inclusive bounds)
        assert!(ranges_conflict(a, b, d("2024-06-05"), d("2024-06-07")));
        // identical range
        assert!(ranges_conflict(a, b, a, b));
    }

    #[test]
    fn test_no_conflict_for_disjoint_ranges() {
        let (a, b) = (d("2024-06-01"), d("2024-06-05"));
        assert!(!ranges_conflict(a, b, d("2024-06-06"), d("2024-06-10")));
        assert!(!ranges_conflict(a, b, d("2024-05-20"), d("2024-05-31")));
    }

    #[test]
    fn test_enclosing_range_is_not_an_endpoint_conflict() {
        // Neither proposed endpoint lies inside [06-03, 06-04].
        assert!(!ranges_conflict(d("2024-06-03"), d("2024-06-04"), d("2024-06-01"), d("2024-06-10")));
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[3, 5]), Some(4.0));
        assert_eq!(average(&[1, 2, 2]), Some(5.0 / 3.0));
    }

    fn spot(owner_id: i64) -> Spot {
        Spot {
            id: 7,
            owner_id,
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: "USA".into(),
            lat: 39.78,
            lng: -89.65,
            name: "Cabin".into(),
            description: "Cozy".into(),
            price: 100.0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_authorize_spot_mutation() {
        assert!(authorize_spot_mutation(&spot(1), 1).is_ok());
        assert!(matches!(authorize_spot_mutation(&spot(1), 2), Err(AppError::Forbidden(_))));
    }
}
