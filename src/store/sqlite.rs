use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::SpotStore;
use crate::error::AppResult;
use crate::types::{
    Booking, BookingWithSpot, NewBooking, NewReview, NewUser, PageRequest, Review, ReviewDetail,
    ReviewImage, Spot, SpotFilter, SpotImage, SpotInput, SpotSummary, User, UserCredentials, UserSummary,
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, username";
const SPOT_COLUMNS: &str =
    "id, owner_id, address, city, state, country, lat, lng, name, description, price, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, user_id, spot_id, review, stars, created_at, updated_at";
const BOOKING_COLUMNS: &str = "id, spot_id, user_id, start_date, end_date, created_at, updated_at";

/// Preview image of spot `s`: the oldest image flagged as preview.
const PREVIEW_IMAGE_SUBQUERY: &str =
    "(SELECT si.url FROM spot_images si WHERE si.spot_id = s.id AND si.preview = 1 ORDER BY si.id LIMIT 1)";

/// SQLite-backed [`SpotStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn spot_summaries(&self, ids: &[i64]) -> AppResult<HashMap<i64, SpotSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT s.id, s.owner_id, s.address, s.city, s.state, s.country, s.lat, s.lng, s.name, s.price, \
             {} AS preview_image FROM spots s WHERE s.id IN (",
            PREVIEW_IMAGE_SUBQUERY
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let rows: Vec<SpotSummary> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|s| (s.id, s)).collect())
    }

    async fn review_images_for(&self, review_ids: &[i64]) -> AppResult<HashMap<i64, Vec<ReviewImage>>> {
        let mut out: HashMap<i64, Vec<ReviewImage>> = HashMap::new();
        if review_ids.is_empty() {
            return Ok(out);
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, review_id, url FROM review_images WHERE review_id IN (");
        let mut separated = qb.separated(", ");
        for id in review_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");
        let rows: Vec<ReviewImage> = qb.build_query_as().fetch_all(&self.pool).await?;
        for image in rows {
            out.entry(image.review_id).or_default().push(image);
        }
        Ok(out)
    }

    /// Attaches reviewer, images and (optionally) the spot to each review.
    async fn review_details(&self, reviews: Vec<Review>, with_spot: bool) -> AppResult<Vec<ReviewDetail>> {
        let review_ids: Vec<i64> = reviews.iter().map(|r| r.id).collect();
        let mut images = self.review_images_for(&review_ids).await?;

        let spots = if with_spot {
            let mut spot_ids: Vec<i64> = reviews.iter().map(|r| r.spot_id).collect();
            spot_ids.sort_unstable();
            spot_ids.dedup();
            self.spot_summaries(&spot_ids).await?
        } else {
            HashMap::new()
        };

        let mut users: HashMap<i64, UserSummary> = HashMap::new();
        let mut details = Vec::with_capacity(reviews.len());
        for review in reviews {
            let user = match users.get(&review.user_id) {
                Some(u) => u.clone(),
                None => {
                    let u = self.find_user_summary(review.user_id).await?.ok_or_else(|| {
                        anyhow::anyhow!("review {} references missing user {}", review.id, review.user_id)
                    })?;
                    users.insert(review.user_id, u.clone());
                    u
                }
            };
            let spot = if with_spot { spots.get(&review.spot_id).cloned() } else { None };
            let review_images = images.remove(&review.id).unwrap_or_default();
            details.push(ReviewDetail { review, user, spot, review_images });
        }
        Ok(details)
    }
}

#[async_trait]
impl SpotStore for SqliteStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users (first_name, last_name, email, username, password_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_credential(&self, credential: &str) -> AppResult<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE email = ?1 OR username = ?1 LIMIT 1",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserCredentials>(&sql).bind(credential).fetch_optional(&self.pool).await?)
    }

    async fn find_user_summary(&self, id: i64) -> AppResult<Option<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>("SELECT id, first_name, last_name FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_spots(&self, filter: &SpotFilter, page: PageRequest) -> AppResult<Vec<Spot>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {} FROM spots WHERE 1 = 1", SPOT_COLUMNS));
        let bounds = [
            (" AND lat >= ", filter.min_lat),
            (" AND lat <= ", filter.max_lat),
            (" AND lng >= ", filter.min_lng),
            (" AND lng <= ", filter.max_lng),
            (" AND price >= ", filter.min_price),
            (" AND price <= ", filter.max_price),
        ];
        for (clause, value) in bounds {
            if let Some(v) = value {
                qb.push(clause).push_bind(v);
            }
        }
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(page.size))
            .push(" OFFSET ")
            .push_bind(page.offset());
        Ok(qb.build_query_as::<Spot>().fetch_all(&self.pool).await?)
    }

    async fn list_spots_by_owner(&self, owner_id: i64) -> AppResult<Vec<Spot>> {
        let sql = format!("SELECT {} FROM spots WHERE owner_id = ?1 ORDER BY id", SPOT_COLUMNS);
        Ok(sqlx::query_as::<_, Spot>(&sql).bind(owner_id).fetch_all(&self.pool).await?)
    }

    async fn find_spot_by_id(&self, id: i64) -> AppResult<Option<Spot>> {
        let sql = format!("SELECT {} FROM spots WHERE id = ?1", SPOT_COLUMNS);
        Ok(sqlx::query_as::<_, Spot>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_spot(&self, owner_id: i64, input: &SpotInput) -> AppResult<Spot> {
        let sql = format!(
            "INSERT INTO spots (owner_id, address, city, state, country, lat, lng, name, description, price) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {}",
            SPOT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Spot>(&sql)
            .bind(owner_id)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.country)
            .bind(input.lat)
            .bind(input.lng)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_spot(&self, id: i64, input: &SpotInput) -> AppResult<Spot> {
        let sql = format!(
            "UPDATE spots SET address = ?1, city = ?2, state = ?3, country = ?4, lat = ?5, lng = ?6, \
             name = ?7, description = ?8, price = ?9, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') \
             WHERE id = ?10 RETURNING {}",
            SPOT_COLUMNS
        );
        // RowNotFound maps to 404 if the spot vanished in between.
        Ok(sqlx::query_as::<_, Spot>(&sql)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.country)
            .bind(input.lat)
            .bind(input.lng)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_spot(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM spots WHERE id = ?1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_spot_images(&self, spot_id: i64) -> AppResult<Vec<SpotImage>> {
        Ok(sqlx::query_as::<_, SpotImage>(
            "SELECT id, spot_id, url, preview FROM spot_images WHERE spot_id = ?1 ORDER BY id",
        )
        .bind(spot_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn preview_images_for_spots(&self, spot_ids: &[i64]) -> AppResult<HashMap<i64, String>> {
        if spot_ids.is_empty() {
            return Ok(HashMap::new());
        }
        // Oldest preview image per spot.
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT si.spot_id, si.url FROM spot_images si \
             JOIN (SELECT spot_id, MIN(id) AS id FROM spot_images WHERE preview = 1 AND spot_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in spot_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") GROUP BY spot_id) oldest ON oldest.id = si.id");
        let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }

    async fn create_spot_image(&self, spot_id: i64, url: &str, preview: bool) -> AppResult<SpotImage> {
        Ok(sqlx::query_as::<_, SpotImage>(
            "INSERT INTO spot_images (spot_id, url, preview) VALUES (?1, ?2, ?3) RETURNING id, spot_id, url, preview",
        )
        .bind(spot_id)
        .bind(url)
        .bind(preview)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_review_by_id(&self, id: i64) -> AppResult<Option<Review>> {
        let sql = format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS);
        Ok(sqlx::query_as::<_, Review>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_review_by_spot_and_user(&self, spot_id: i64, user_id: i64) -> AppResult<Option<Review>> {
        let sql = format!("SELECT {} FROM reviews WHERE spot_id = ?1 AND user_id = ?2", REVIEW_COLUMNS);
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(spot_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_reviews_by_spot(&self, spot_id: i64) -> AppResult<Vec<ReviewDetail>> {
        let sql = format!("SELECT {} FROM reviews WHERE spot_id = ?1 ORDER BY id", REVIEW_COLUMNS);
        let reviews = sqlx::query_as::<_, Review>(&sql).bind(spot_id).fetch_all(&self.pool).await?;
        self.review_details(reviews, false).await
    }

    async fn list_reviews_by_user(&self, user_id: i64) -> AppResult<Vec<ReviewDetail>> {
        let sql = format!("SELECT {} FROM reviews WHERE user_id = ?1 ORDER BY id", REVIEW_COLUMNS);
        let reviews = sqlx::query_as::<_, Review>(&sql).bind(user_id).fetch_all(&self.pool).await?;
        self.review_details(reviews, true).await
    }

    async fn review_stars_by_spot(&self, spot_id: i64) -> AppResult<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT stars FROM reviews WHERE spot_id = ?1")
            .bind(spot_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn review_stars_for_spots(&self, spot_ids: &[i64]) -> AppResult<HashMap<i64, Vec<i64>>> {
        let mut out: HashMap<i64, Vec<i64>> = HashMap::new();
        if spot_ids.is_empty() {
            return Ok(out);
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT spot_id, stars FROM reviews WHERE spot_id IN (");
        let mut separated = qb.separated(", ");
        for id in spot_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (spot_id, stars) in rows {
            out.entry(spot_id).or_default().push(stars);
        }
        Ok(out)
    }

    async fn create_review(&self, review: &NewReview) -> AppResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (spot_id, user_id, review, stars) VALUES (?1, ?2, ?3, ?4) RETURNING {}",
            REVIEW_COLUMNS
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(review.spot_id)
            .bind(review.user_id)
            .bind(&review.review)
            .bind(review.stars)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_review_images(&self, review_id: i64) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM review_images WHERE review_id = ?1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_review_image(&self, review_id: i64, url: &str) -> AppResult<ReviewImage> {
        Ok(sqlx::query_as::<_, ReviewImage>(
            "INSERT INTO review_images (review_id, url) VALUES (?1, ?2) RETURNING id, review_id, url",
        )
        .bind(review_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_bookings_by_spot(&self, spot_id: i64) -> AppResult<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE spot_id = ?1 ORDER BY start_date", BOOKING_COLUMNS);
        Ok(sqlx::query_as::<_, Booking>(&sql).bind(spot_id).fetch_all(&self.pool).await?)
    }

    async fn list_bookings_with_guests(&self, spot_id: i64) -> AppResult<Vec<(Booking, UserSummary)>> {
        let bookings = self.list_bookings_by_spot(spot_id).await?;
        let mut users: HashMap<i64, UserSummary> = HashMap::new();
        let mut out = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let guest = match users.get(&booking.user_id) {
                Some(g) => g.clone(),
                None => {
                    let g = self.find_user_summary(booking.user_id).await?.ok_or_else(|| {
                        anyhow::anyhow!("booking {} references missing user {}", booking.id, booking.user_id)
                    })?;
                    users.insert(booking.user_id, g.clone());
                    g
                }
            };
            out.push((booking, guest));
        }
        Ok(out)
    }

    async fn list_bookings_by_user(&self, user_id: i64) -> AppResult<Vec<BookingWithSpot>> {
        let sql = format!("SELECT {} FROM bookings WHERE user_id = ?1 ORDER BY start_date", BOOKING_COLUMNS);
        let bookings = sqlx::query_as::<_, Booking>(&sql).bind(user_id).fetch_all(&self.pool).await?;

        let mut spot_ids: Vec<i64> = bookings.iter().map(|b| b.spot_id).collect();
        spot_ids.sort_unstable();
        spot_ids.dedup();
        let spots = self.spot_summaries(&spot_ids).await?;

        Ok(bookings
            .into_iter()
            .filter_map(|booking| {
                spots.get(&booking.spot_id).cloned().map(|spot| BookingWithSpot { booking, spot })
            })
            .collect())
    }

    async fn create_booking(&self, booking: &NewBooking) -> AppResult<Booking> {
        let sql = format!(
            "INSERT INTO bookings (spot_id, user_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4) RETURNING {}",
            BOOKING_COLUMNS
        );
        // The bookings_no_overlap trigger turns a lost race into booking_overlap().
        Ok(sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.spot_id)
            .bind(booking.user_id)
            .bind(booking.start_date)
            .bind(booking.end_date)
            .fetch_one(&self.pool)
            .await?)
    }
}
