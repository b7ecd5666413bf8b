#[cfg(test)]
mod tests {
    use crate::db;
    use crate::store::{SpotStore, SqliteStore};
    use crate::tests::support::setup_test_db;

    async fn insert_user(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, email, username, password_hash) \
             VALUES (?1, 'T', ?1 || '@example.com', ?1, 'x') RETURNING id",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn insert_spot(pool: &sqlx::SqlitePool, owner_id: i64) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO spots (owner_id, address, city, state, country, lat, lng, name, description, price) \
             VALUES (?1, 'a', 'b', 'c', 'd', 0, 0, 'n', 'd', 10) RETURNING id",
        )
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn insert_booking(pool: &sqlx::SqlitePool, spot_id: i64, user_id: i64, start: &str, end: &str) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO bookings (spot_id, user_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)")
            .bind(spot_id)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .execute(pool)
            .await
            .map(|_| ())
    }

    #[tokio::test]
    async fn test_init_db_creates_schema() {
        let (pool, _dir) = setup_test_db().await;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        for table in ["bookings", "review_images", "reviews", "spot_images", "spots", "users"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }

        let trigger: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='trigger' AND name='bookings_no_overlap'")
                .fetch_optional(&pool)
                .await
                .unwrap();
        assert!(trigger.is_some());

        // Idempotent
        db::init_db(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_overlap_trigger() {
        let (pool, _dir) = setup_test_db().await;
        let owner = insert_user(&pool, "owner").await;
        let guest = insert_user(&pool, "guest").await;
        let spot = insert_spot(&pool, owner).await;

        insert_booking(&pool, spot, guest, "2024-06-01", "2024-06-05").await.unwrap();
        let err = insert_booking(&pool, spot, guest, "2024-06-05", "2024-06-08").await.unwrap_err();
        assert!(err.to_string().contains(crate::error::BOOKING_OVERLAP_MARKER));

        let mapped: crate::error::AppError = err.into();
        assert!(matches!(mapped, crate::error::AppError::Conflict { .. }));

        insert_booking(&pool, spot, guest, "2024-06-06", "2024-06-08").await.unwrap();
    }

    #[tokio::test]
    async fn test_check_constraints() {
        let (pool, _dir) = setup_test_db().await;
        let owner = insert_user(&pool, "owner").await;
        let spot = insert_spot(&pool, owner).await;

        // end before start
        assert!(insert_booking(&pool, spot, owner, "2024-06-05", "2024-06-01").await.is_err());

        let bad_stars = sqlx::query("INSERT INTO reviews (spot_id, user_id, review, stars) VALUES (?1, ?2, 'x', 6)")
            .bind(spot)
            .bind(owner)
            .execute(&pool)
            .await;
        assert!(bad_stars.is_err());
    }

    #[tokio::test]
    async fn test_one_review_per_user_and_spot() {
        let (pool, _dir) = setup_test_db().await;
        let owner = insert_user(&pool, "owner").await;
        let guest = insert_user(&pool, "guest").await;
        let spot = insert_spot(&pool, owner).await;

        let insert = || {
            sqlx::query("INSERT INTO reviews (spot_id, user_id, review, stars) VALUES (?1, ?2, 'ok', 4)")
                .bind(spot)
                .bind(guest)
                .execute(&pool)
        };
        insert().await.unwrap();
        let err = insert().await.unwrap_err();
        let mapped: crate::error::AppError = err.into();
        match mapped {
            crate::error::AppError::Conflict { message, errors } => {
                assert_eq!(message, "Record already exists");
                // Composite constraints name no single field.
                assert!(errors.is_empty());
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unique_violation_hides_table_names() {
        let (pool, _dir) = setup_test_db().await;
        insert_user(&pool, "taken").await;
        let err = sqlx::query(
            "INSERT INTO users (first_name, last_name, email, username, password_hash) \
             VALUES ('A', 'B', 'new@example.com', 'taken', 'x')",
        )
        .execute(&pool)
        .await
        .unwrap_err();

        let mapped: crate::error::AppError = err.into();
        let body = format!("{:?}", mapped);
        assert!(!body.contains("UNIQUE"));
        assert!(!body.contains("users."));
        match mapped {
            crate::error::AppError::Conflict { errors, .. } => {
                assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["username"]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preview_images_for_spots_picks_oldest_preview() {
        let (pool, _dir) = setup_test_db().await;
        let owner = insert_user(&pool, "owner").await;
        let first = insert_spot(&pool, owner).await;
        let second = insert_spot(&pool, owner).await;
        let bare = insert_spot(&pool, owner).await;
        for (spot, url, preview) in [(first, "a.png", 0), (first, "b.png", 1), (first, "c.png", 1), (second, "d.png", 1), (bare, "e.png", 0)] {
            sqlx::query("INSERT INTO spot_images (spot_id, url, preview) VALUES (?1, ?2, ?3)")
                .bind(spot)
                .bind(url)
                .bind(preview)
                .execute(&pool)
                .await
                .unwrap();
        }

        let store = SqliteStore::new(pool);
        let previews = store.preview_images_for_spots(&[first, second, bare]).await.unwrap();
        assert_eq!(previews.len(), 2);
        assert_eq!(previews[&first], "b.png");
        assert_eq!(previews[&second], "d.png");
        assert!(!previews.contains_key(&bare));
    }

    #[tokio::test]
    async fn test_spot_delete_cascades() {
        let (pool, _dir) = setup_test_db().await;
        let owner = insert_user(&pool, "owner").await;
        let guest = insert_user(&pool, "guest").await;
        let spot = insert_spot(&pool, owner).await;
        insert_booking(&pool, spot, guest, "2024-06-01", "2024-06-05").await.unwrap();
        sqlx::query("INSERT INTO spot_images (spot_id, url, preview) VALUES (?1, 'u', 1)")
            .bind(spot)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM spots WHERE id = ?1").bind(spot).execute(&pool).await.unwrap();

        let bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings").fetch_one(&pool).await.unwrap();
        let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spot_images").fetch_one(&pool).await.unwrap();
        assert_eq!((bookings, images), (0, 0));
    }
}
