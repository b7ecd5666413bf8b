//! Request extraction and field-level input validation.
//!
//! Everything here runs before the booking validator or the store are
//! touched: malformed bodies and out-of-range fields short-circuit with a
//! `400` carrying one message per offending field.

use axum::extract::{FromRequest, FromRequestParts};
use chrono::NaiveDate;

use crate::config::PaginationConfig;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::types::{
    BookingRequest, LoginRequest, PageRequest, ReviewImageRequest, ReviewRequest, SignupRequest,
    SpotFilter, SpotImageRequest, SpotInput, SpotListQuery, SpotRequest,
};

/// JSON body extractor whose rejection is an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path extractor whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

pub const MAX_SPOT_NAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 4;

/// Collects field errors and turns them into a single rejection.
#[derive(Default)]
struct Errors(FieldErrors);

impl Errors {
    fn add(&mut self, field: &str, message: &str) {
        self.0.entry(field.to_string()).or_insert_with(|| message.to_string());
    }

    fn finish(self) -> AppResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.0))
        }
    }
}

fn required_text(value: Option<String>, field: &str, message: &str, errors: &mut Errors) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.add(field, message);
            String::new()
        }
    }
}

fn in_range(value: Option<f64>, min: f64, max: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && (min..=max).contains(v))
}

pub fn validate_spot(req: SpotRequest) -> AppResult<SpotInput> {
    let mut errors = Errors::default();

    let address = required_text(req.address, "address", "Street address is required", &mut errors);
    let city = required_text(req.city, "city", "City is required", &mut errors);
    let state = required_text(req.state, "state", "State is required", &mut errors);
    let country = required_text(req.country, "country", "Country is required", &mut errors);

    let lat = in_range(req.lat, -90.0, 90.0);
    if lat.is_none() {
        errors.add("lat", "Latitude must be within -90 and 90");
    }
    let lng = in_range(req.lng, -180.0, 180.0);
    if lng.is_none() {
        errors.add("lng", "Longitude must be within -180 and 180");
    }

    let name = required_text(req.name, "name", "Name is required", &mut errors);
    if name.chars().count() > MAX_SPOT_NAME_LEN {
        errors.add("name", "Name must be less than 50 characters");
    }
    let description = required_text(req.description, "description", "Description is required", &mut errors);

    let price = req.price.filter(|p| p.is_finite() && *p >= 0.0);
    if price.is_none() {
        errors.add("price", "Price per day must be a non-negative number");
    }

    errors.finish()?;
    Ok(SpotInput {
        address,
        city,
        state,
        country,
        lat: lat.unwrap_or_default(),
        lng: lng.unwrap_or_default(),
        name,
        description,
        price: price.unwrap_or_default(),
    })
}

fn parse_date(value: Option<&str>, field: &str, errors: &mut Errors) -> Option<NaiveDate> {
    match value.map(str::trim) {
        None | Some("") => {
            errors.add(field, &format!("{} is required", field));
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                errors.add(field, &format!("{} must be a valid date (YYYY-MM-DD)", field));
                None
            }
        },
    }
}

/// Parses both booking dates and checks `startDate < endDate`.
pub fn validate_booking_dates(req: &BookingRequest) -> AppResult<(NaiveDate, NaiveDate)> {
    let mut errors = Errors::default();
    let start = parse_date(req.start_date.as_deref(), "startDate", &mut errors);
    let end = parse_date(req.end_date.as_deref(), "endDate", &mut errors);

    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            errors.add("endDate", "endDate cannot be on or before startDate");
        }
    }
    errors.finish()?;

    start
        .zip(end)
        .ok_or_else(|| AppError::BadRequest("startDate and endDate are required".to_string()))
}

/// Returns the trimmed review text and the star count.
pub fn validate_review(req: ReviewRequest) -> AppResult<(String, i64)> {
    let mut errors = Errors::default();
    let text = required_text(req.review, "review", "Review text is required", &mut errors);

    // Whole numbers only; 4.5 stars is rejected rather than truncated.
    let stars = req
        .stars
        .filter(|s| s.is_finite() && s.fract() == 0.0 && (1.0..=5.0).contains(s))
        .map(|s| s as i64);
    if stars.is_none() {
        errors.add("stars", "Stars must be an integer from 1 to 5");
    }

    errors.finish()?;
    Ok((text, stars.unwrap_or_default()))
}

pub fn validate_spot_image(req: SpotImageRequest) -> AppResult<(String, bool)> {
    let mut errors = Errors::default();
    let url = required_text(req.url, "url", "Image url is required", &mut errors);
    errors.finish()?;
    Ok((url, req.preview.unwrap_or(false)))
}

pub fn validate_review_image(req: ReviewImageRequest) -> AppResult<String> {
    let mut errors = Errors::default();
    let url = required_text(req.url, "url", "Image url is required", &mut errors);
    errors.finish()?;
    Ok(url)
}

fn parse_bound(raw: Option<&str>, field: &str, min: f64, max: f64, message: &str, errors: &mut Errors) -> Option<f64> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<f64>().ok().filter(|v| v.is_finite() && (min..=max).contains(v)) {
        Some(v) => Some(v),
        None => {
            errors.add(field, message);
            None
        }
    }
}

fn parse_page_param(raw: Option<&str>, field: &str, label: &str, default: u32, max: u32, errors: &mut Errors) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(v) if v < 1 => {
            errors.add(field, &format!("{} must be greater than or equal to 1", label));
            default
        }
        Ok(v) if v > i64::from(max) => {
            errors.add(field, &format!("{} must be less than or equal to {}", label, max));
            default
        }
        Ok(v) => u32::try_from(v).unwrap_or(default),
        Err(_) => {
            errors.add(field, &format!("{} must be an integer", label));
            default
        }
    }
}

/// Validates listing query parameters against the configured pagination limits.
pub fn validate_spot_query(q: &SpotListQuery, limits: &PaginationConfig) -> AppResult<(SpotFilter, PageRequest)> {
    let mut errors = Errors::default();

    let page = parse_page_param(q.page.as_deref(), "page", "Page", limits.default_page, limits.max_page, &mut errors);
    let size = parse_page_param(q.size.as_deref(), "size", "Size", limits.default_size, limits.max_size, &mut errors);

    let filter = SpotFilter {
        min_lat: parse_bound(q.min_lat.as_deref(), "minLat", -90.0, 90.0, "Minimum latitude is invalid", &mut errors),
        max_lat: parse_bound(q.max_lat.as_deref(), "maxLat", -90.0, 90.0, "Maximum latitude is invalid", &mut errors),
        min_lng: parse_bound(q.min_lng.as_deref(), "minLng", -180.0, 180.0, "Minimum longitude is invalid", &mut errors),
        max_lng: parse_bound(q.max_lng.as_deref(), "maxLng", -180.0, 180.0, "Maximum longitude is invalid", &mut errors),
        min_price: parse_bound(
            q.min_price.as_deref(),
            "minPrice",
            0.0,
            f64::MAX,
            "Minimum price must be greater than or equal to 0",
            &mut errors,
        ),
        max_price: parse_bound(
            q.max_price.as_deref(),
            "maxPrice",
            0.0,
            f64::MAX,
            "Maximum price must be greater than or equal to 0",
            &mut errors,
        ),
    };

    errors.finish()?;
    Ok((filter, PageRequest { page, size }))
}

/// Validated sign-up fields; the password is still plain text here.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn validate_signup(req: SignupRequest) -> AppResult<SignupInput> {
    let mut errors = Errors::default();

    let email = required_text(req.email, "email", "Invalid email", &mut errors).to_lowercase();
    if !email.is_empty() && !looks_like_email(&email) {
        errors.add("email", "Invalid email");
    }
    let username = required_text(req.username, "username", "Username is required", &mut errors);
    if !username.is_empty() && username.chars().count() < MIN_USERNAME_LEN {
        errors.add("username", "Please provide a username with at least 4 characters.");
    }
    if looks_like_email(&username) {
        errors.add("username", "Username cannot be an email.");
    }
    let first_name = required_text(req.first_name, "firstName", "First Name is required", &mut errors);
    let last_name = required_text(req.last_name, "lastName", "Last Name is required", &mut errors);

    let password = req.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be 6 characters or more.");
    }

    errors.finish()?;
    Ok(SignupInput { first_name, last_name, email, username, password })
}

/// Emails are stored lowercased, so an email credential is matched the same way.
/// Usernames stay case-sensitive.
pub fn validate_login(req: LoginRequest) -> AppResult<(String, String)> {
    let mut errors = Errors::default();
    let mut credential = required_text(req.credential, "credential", "Email or username is required", &mut errors);
    if looks_like_email(&credential) {
        credential = credential.to_lowercase();
    }
    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()?;
    Ok((credential, password))
}

/// Strips control characters and caps length before user input reaches the logs.
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .take(200)
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
