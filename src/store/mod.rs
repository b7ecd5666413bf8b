//! Persistence gateway.
//!
//! Handlers and the booking validator only see the [`SpotStore`] trait; the
//! concrete store is constructed once at startup and handed around through
//! [`crate::state::AppState`].

mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::{
    Booking, BookingWithSpot, NewBooking, NewReview, NewUser, PageRequest, Review, ReviewDetail,
    ReviewImage, Spot, SpotFilter, SpotImage, SpotInput, User, UserCredentials, UserSummary,
};

pub use sqlite::SqliteStore;

/// Read/write access to users, spots, images, reviews and bookings.
///
/// Implementations must reject a booking insert that overlaps an existing
/// booking of the same spot with [`crate::error::booking_overlap`], and a
/// second review for the same (spot, user) pair with a conflict. The
/// validator checks both before writing, but only the store can close the
/// window between that check and the insert.
#[async_trait]
pub trait SpotStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> AppResult<()>;

    // users
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;
    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>>;
    /// Looks a user up by email or username.
    async fn find_user_by_credential(&self, credential: &str) -> AppResult<Option<UserCredentials>>;
    async fn find_user_summary(&self, id: i64) -> AppResult<Option<UserSummary>>;

    // spots
    async fn list_spots(&self, filter: &SpotFilter, page: PageRequest) -> AppResult<Vec<Spot>>;
    async fn list_spots_by_owner(&self, owner_id: i64) -> AppResult<Vec<Spot>>;
    async fn find_spot_by_id(&self, id: i64) -> AppResult<Option<Spot>>;
    async fn create_spot(&self, owner_id: i64, input: &SpotInput) -> AppResult<Spot>;
    async fn update_spot(&self, id: i64, input: &SpotInput) -> AppResult<Spot>;
    async fn delete_spot(&self, id: i64) -> AppResult<()>;

    // spot images
    async fn list_spot_images(&self, spot_id: i64) -> AppResult<Vec<SpotImage>>;
    /// Preview image URL of each spot in `spot_ids` that has one.
    async fn preview_images_for_spots(&self, spot_ids: &[i64]) -> AppResult<HashMap<i64, String>>;
    async fn create_spot_image(&self, spot_id: i64, url: &str, preview: bool) -> AppResult<SpotImage>;

    // reviews
    async fn find_review_by_id(&self, id: i64) -> AppResult<Option<Review>>;
    async fn find_review_by_spot_and_user(&self, spot_id: i64, user_id: i64) -> AppResult<Option<Review>>;
    async fn list_reviews_by_spot(&self, spot_id: i64) -> AppResult<Vec<ReviewDetail>>;
    async fn list_reviews_by_user(&self, user_id: i64) -> AppResult<Vec<ReviewDetail>>;
    async fn review_stars_by_spot(&self, spot_id: i64) -> AppResult<Vec<i64>>;
    /// Star values grouped by spot; spots without reviews are absent.
    async fn review_stars_for_spots(&self, spot_ids: &[i64]) -> AppResult<HashMap<i64, Vec<i64>>>;
    async fn create_review(&self, review: &NewReview) -> AppResult<Review>;

    // review images
    async fn count_review_images(&self, review_id: i64) -> AppResult<i64>;
    async fn create_review_image(&self, review_id: i64, url: &str) -> AppResult<ReviewImage>;

    // bookings
    async fn list_bookings_by_spot(&self, spot_id: i64) -> AppResult<Vec<Booking>>;
    /// Bookings of a spot together with the identity of each booker.
    async fn list_bookings_with_guests(&self, spot_id: i64) -> AppResult<Vec<(Booking, UserSummary)>>;
    async fn list_bookings_by_user(&self, user_id: i64) -> AppResult<Vec<BookingWithSpot>>;
    async fn create_booking(&self, booking: &NewBooking) -> AppResult<Booking>;
}
