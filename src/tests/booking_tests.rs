#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::booking::{
        compute_average_rating, compute_average_ratings, list_bookings_for_spot, validate_booking_request,
        validate_review_request, RatingSummary,
    };
    use crate::error::AppError;
    use crate::store::{SpotStore, SqliteStore};
    use crate::tests::support::{seed_spot, seed_user, setup_test_db};
    use crate::types::{BookingView, NewBooking};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn store() -> (SqliteStore, tempfile::TempDir) {
        let (pool, dir) = setup_test_db().await;
        (SqliteStore::new(pool), dir)
    }

    #[tokio::test]
    async fn test_non_owner_booking_persists_exact_range() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let guest = seed_user(&store, "Guest").await;
        let spot = seed_spot(&store, owner.id).await;

        let booking = validate_booking_request(&store, spot.id, guest.id, d("2024-06-01"), d("2024-06-05"))
            .await
            .unwrap();
        assert_eq!(booking.spot_id, spot.id);
        assert_eq!(booking.user_id, guest.id);

        let stored = store.list_bookings_by_spot(spot.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].start_date, d("2024-06-01"));
        assert_eq!(stored[0].end_date, d("2024-06-05"));
    }

    #[tokio::test]
    async fn test_owner_cannot_book_own_spot() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let spot = seed_spot(&store, owner.id).await;

        for (start, end) in [("2024-01-01", "2024-01-02"), ("2030-12-01", "2030-12-31")] {
            let result = validate_booking_request(&store, spot.id, owner.id, d(start), d(end)).await;
            assert!(matches!(result, Err(AppError::Forbidden(_))), "got {:?}", result);
        }
        assert!(store.list_bookings_by_spot(spot.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_spot_is_not_found() {
        let (store, _dir) = store().await;
        let guest = seed_user(&store, "Guest").await;
        let result = validate_booking_request(&store, 999, guest.id, d("2024-06-01"), d("2024-06-05")).await;
        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Spot couldn't be found"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlapping_endpoints_conflict() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let first = seed_user(&store, "First").await;
        let second = seed_user(&store, "Second").await;
        let spot = seed_spot(&store, owner.id).await;

        validate_booking_request(&store, spot.id, first.id, d("2024-06-01"), d("2024-06-05")).await.unwrap();

        for (start, end) in [
            ("2024-06-04", "2024-06-10"),
            ("2024-05-28", "2024-06-01"),
            ("2024-06-05", "2024-06-06"),
            ("2024-06-02", "2024-06-03"),
        ] {
            let result = validate_booking_request(&store, spot.id, second.id, d(start), d(end)).await;
            match result {
                Err(AppError::Conflict { message, errors }) => {
                    assert_eq!(message, "Sorry, this spot is already booked for the specified dates");
                    assert!(errors.contains_key("startDate"));
                    assert!(errors.contains_key("endDate"));
                }
                other => panic!("expected conflict for {}..{}, got {:?}", start, end, other),
            }
        }

        // Adjacent but not touching
        validate_booking_request(&store, spot.id, second.id, d("2024-06-06"), d("2024-06-09")).await.unwrap();
        assert_eq!(store.list_bookings_by_spot(spot.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_dates_on_other_spot_are_independent() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let guest = seed_user(&store, "Guest").await;
        let a = seed_spot(&store, owner.id).await;
        let b = seed_spot(&store, owner.id).await;

        validate_booking_request(&store, a.id, guest.id, d("2024-06-01"), d("2024-06-05")).await.unwrap();
        validate_booking_request(&store, b.id, guest.id, d("2024-06-01"), d("2024-06-05")).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_rejects_overlap_that_skipped_the_check() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let guest = seed_user(&store, "Guest").await;
        let spot = seed_spot(&store, owner.id).await;

        let booking = |start: &str, end: &str| NewBooking {
            spot_id: spot.id,
            user_id: guest.id,
            start_date: d(start),
            end_date: d(end),
        };
        store.create_booking(&booking("2024-06-01", "2024-06-05")).await.unwrap();
        let raced = store.create_booking(&booking("2024-06-04", "2024-06-10")).await;
        assert!(matches!(raced, Err(AppError::Conflict { .. })), "got {:?}", raced);
    }

    #[tokio::test]
    async fn test_review_rules_in_order() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let guest = seed_user(&store, "Guest").await;
        let spot = seed_spot(&store, owner.id).await;

        let missing = validate_review_request(&store, 999, guest.id, 5, "Great").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let own = validate_review_request(&store, spot.id, owner.id, 5, "My place is great").await;
        assert!(matches!(own, Err(AppError::Forbidden(_))));

        let review = validate_review_request(&store, spot.id, guest.id, 4, "Lovely").await.unwrap();
        assert_eq!(review.stars, 4);
        assert_eq!(review.review, "Lovely");

        match validate_review_request(&store, spot.id, guest.id, 1, "Changed my mind").await {
            Err(AppError::Conflict { message, .. }) => assert_eq!(message, "User already has a review for this spot"),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(store.review_stars_by_spot(spot.id).await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_average_rating() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let a = seed_user(&store, "Alice").await;
        let b = seed_user(&store, "Bob").await;
        let spot = seed_spot(&store, owner.id).await;

        let empty = compute_average_rating(&store, spot.id).await.unwrap();
        assert_eq!(empty, RatingSummary { num_reviews: 0, average: None });

        validate_review_request(&store, spot.id, a.id, 3, "Okay").await.unwrap();
        validate_review_request(&store, spot.id, b.id, 5, "Superb").await.unwrap();
        let rated = compute_average_rating(&store, spot.id).await.unwrap();
        assert_eq!(rated, RatingSummary { num_reviews: 2, average: Some(4.0) });
    }

    #[tokio::test]
    async fn test_average_ratings_for_many_spots() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let a = seed_user(&store, "Alice").await;
        let b = seed_user(&store, "Bob").await;
        let rated = seed_spot(&store, owner.id).await;
        let unrated = seed_spot(&store, owner.id).await;

        validate_review_request(&store, rated.id, a.id, 2, "Meh").await.unwrap();
        validate_review_request(&store, rated.id, b.id, 5, "Great").await.unwrap();

        let ratings = compute_average_ratings(&store, &[rated.id, unrated.id, 999]).await.unwrap();
        assert_eq!(ratings.len(), 3);
        assert_eq!(ratings[&rated.id], Some(3.5));
        assert_eq!(ratings[&unrated.id], None);
        assert_eq!(ratings[&999], None);

        assert!(compute_average_ratings(&store, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_booking_views_depend_on_ownership() {
        let (store, _dir) = store().await;
        let owner = seed_user(&store, "Owner").await;
        let guest = seed_user(&store, "Guest").await;
        let stranger = seed_user(&store, "Stranger").await;
        let spot = seed_spot(&store, owner.id).await;
        validate_booking_request(&store, spot.id, guest.id, d("2024-06-01"), d("2024-06-05")).await.unwrap();

        let owner_view = list_bookings_for_spot(&store, spot.id, owner.id).await.unwrap();
        match &owner_view[..] {
            [BookingView::Owner { user, booking }] => {
                assert_eq!(user.first_name, "Guest");
                assert_eq!(user.last_name, "Tester");
                assert_eq!(booking.user_id, guest.id);
            }
            other => panic!("unexpected owner view {:?}", other),
        }

        // The booker is not the owner either; they get the public view too.
        for viewer in [stranger.id, guest.id] {
            let view = list_bookings_for_spot(&store, spot.id, viewer).await.unwrap();
            assert_eq!(
                view,
                vec![BookingView::Public { spot_id: spot.id, start_date: d("2024-06-01"), end_date: d("2024-06-05") }]
            );
        }

        let missing = list_bookings_for_spot(&store, 999, owner.id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
