use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------- ENTITIES ----------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
}

/// A user row together with its stored credential. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Public identity attached to owners, reviewers and bookers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: i64,
    pub owner_id: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpotImage {
    pub id: i64,
    #[serde(skip_serializing)]
    pub spot_id: i64,
    pub url: String,
    pub preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub spot_id: i64,
    pub review: String,
    pub stars: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewImage {
    pub id: i64,
    #[serde(skip_serializing)]
    pub review_id: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------- WRITE MODELS ----------------------

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Validated spot attributes, used for both create and full update.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotInput {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub spot_id: i64,
    pub user_id: i64,
    pub review: String,
    pub stars: i64,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub spot_id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Optional coordinate and price bounds for the spot listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotFilter {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lng: Option<f64>,
    pub max_lng: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.size)
    }
}

// ---------------------- REQUEST BODIES ----------------------
// Fields are optional so missing values surface as field-level validation
// errors instead of a generic deserialization failure.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotRequest {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotImageRequest {
    pub url: Option<String>,
    pub preview: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewImageRequest {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub review: Option<String>,
    pub stars: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub credential: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotListQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub min_lat: Option<String>,
    pub max_lat: Option<String>,
    pub min_lng: Option<String>,
    pub max_lng: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

// ---------------------- RESPONSE VIEWS ----------------------

/// Spot as shown in list endpoints. `avg_rating` is `null` for unreviewed spots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotListItem {
    #[serde(flatten)]
    pub spot: Spot,
    pub avg_rating: Option<f64>,
    pub preview_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpotListResponse {
    #[serde(rename = "Spots")]
    pub spots: Vec<SpotListItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Spot detail view. `avg_star_rating` is `0` for unreviewed spots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotDetail {
    #[serde(flatten)]
    pub spot: Spot,
    pub num_reviews: i64,
    pub avg_star_rating: f64,
    #[serde(rename = "SpotImages")]
    pub spot_images: Vec<SpotImage>,
    #[serde(rename = "Owner")]
    pub owner: UserSummary,
}

/// Compact spot embedded in review and booking listings.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpotSummary {
    pub id: i64,
    pub owner_id: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub price: f64,
    pub preview_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    #[serde(rename = "User")]
    pub user: UserSummary,
    #[serde(rename = "Spot", skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotSummary>,
    #[serde(rename = "ReviewImages")]
    pub review_images: Vec<ReviewImage>,
}

/// A booking as seen by a particular caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookingView {
    /// The spot owner sees every field and who booked.
    Owner {
        #[serde(rename = "User")]
        user: UserSummary,
        #[serde(flatten)]
        booking: Booking,
    },
    /// Everyone else only sees which dates are taken.
    #[serde(rename_all = "camelCase")]
    Public {
        spot_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingWithSpot {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(rename = "Spot")]
    pub spot: SpotSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
