#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::tests::support::{send, setup_test_app};

    #[tokio::test]
    async fn test_healthz_and_readyz() {
        let t = setup_test_app().await;

        for (uri, expected) in [("/healthz", "ok"), ("/readyz", "ready")] {
            let response = t
                .app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], expected.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_readyz_fails_when_store_closed() {
        let t = setup_test_app().await;
        t.store.pool().close().await;

        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let t = setup_test_app().await;
        t.state.metrics.inc_spots_created();

        let (status, body) = send(&t.app, Method::GET, "/metrics", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["spots_created"], 1);
        assert_eq!(body["bookings_created"], 0);
        assert!(body["uptime_seconds"].is_u64());

        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/metrics/prometheus").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));
        let text = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        assert!(text.contains("# TYPE spotbook_spots_created counter"));
        assert!(text.contains("spotbook_spots_created 1"));
        assert!(text.contains("spotbook_uptime_seconds"));
    }

    #[tokio::test]
    async fn test_version() {
        let t = setup_test_app().await;
        let (status, body): (StatusCode, Value) = send(&t.app, Method::GET, "/version", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "spotbook");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
