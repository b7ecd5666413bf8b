use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::ErrorDebug;

const MAX_ERROR_BODY: usize = 64 * 1024;

/// Adds a `debug` field with the full error chain to server-error responses
/// while running in development. In production the detail stays in the logs.
pub async fn debug_errors(State(cfg): State<Arc<AppConfig>>, req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    if cfg.server.environment.is_production() {
        return res;
    }
    let Some(ErrorDebug(detail)) = res.extensions().get::<ErrorDebug>().cloned() else {
        return res;
    };

    let (mut parts, body) = res.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("could not buffer error body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) if value.is_object() => {
            value["debug"] = serde_json::Value::String(detail);
            parts.headers.remove(CONTENT_LENGTH);
            Body::from(value.to_string())
        }
        _ => Body::from(bytes),
    };
    Response::from_parts(parts, body)
}
