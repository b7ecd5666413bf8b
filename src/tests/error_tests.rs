#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::{AppConfig, Environment};
    use crate::error::{booking_overlap, AppError, AppResult, FieldErrors, OptionExt};

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::NotFound("Spot couldn't be found".to_string());
        assert_eq!(format!("{}", error), "Not found: Spot couldn't be found");

        let error = AppError::RateLimited { retry_after_seconds: 60 };
        assert_eq!(format!("{}", error), "Rate limited. Retry after 60 seconds");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::validation(FieldErrors::new()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::conflict("x"), StatusCode::FORBIDDEN),
            (booking_overlap(), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::RateLimited { retry_after_seconds: 3 }, StatusCode::TOO_MANY_REQUESTS),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_validation_body_shape() {
        let mut errors = FieldErrors::new();
        errors.insert("city".into(), "City is required".into());
        let response = AppError::validation(errors).into_response();
        let body = body_json(response).await;

        assert_eq!(body["message"], "Bad Request");
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"]["city"], "City is required");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError::Internal(anyhow::anyhow!("secret connection string")).into_response();
        assert!(response.extensions().get::<crate::error::ErrorDebug>().is_some());
        let body = body_json(response).await;

        assert_eq!(body["message"], "An internal server error occurred");
        assert!(body["error"]["details"]["error_id"].is_string());
        assert!(!body.to_string().contains("secret connection string"));
    }

    #[test]
    fn test_from_sqlx_errors() {
        let not_found: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let timeout: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(timeout, AppError::ServiceUnavailable(_)));

        let other: AppError = sqlx::Error::Protocol("bad frame".into()).into();
        assert!(matches!(other, AppError::Database(_)));
    }

    #[test]
    fn test_option_ext() {
        let found: AppResult<i32> = Some(1).ok_or_not_found("Spot");
        assert_eq!(found.unwrap(), 1);

        match None::<i32>.ok_or_not_found("Review") {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Review couldn't be found"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    fn failing_app(environment: Environment) -> Router {
        let mut cfg = AppConfig::default();
        cfg.server.environment = environment;
        Router::new()
            .route("/boom", get(|| async { AppError::Internal(anyhow::anyhow!("disk on fire")) }))
            .route("/missing", get(|| async { AppError::NotFound("nothing here".into()) }))
            .layer(from_fn_with_state(Arc::new(cfg), crate::middleware::errors::debug_errors))
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
        body_json(response).await
    }

    #[tokio::test]
    async fn test_debug_detail_only_in_development() {
        let dev = get_json(failing_app(Environment::Development), "/boom").await;
        assert!(dev["debug"].as_str().unwrap().contains("disk on fire"));
        assert_eq!(dev["status"], 500);

        let prod = get_json(failing_app(Environment::Production), "/boom").await;
        assert!(prod.get("debug").is_none());

        // Client errors carry no extra detail in either mode.
        let not_found = get_json(failing_app(Environment::Development), "/missing").await;
        assert!(not_found.get("debug").is_none());
    }
}
