//! Security headers for API responses.
//!
//! Every response is JSON or plain text, so the header set is the API subset:
//! no framing, no sniffing, no referrer, no caching of JSON bodies. HSTS and
//! CSP are opt-in through the `[security]` config section.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::AppConfig;

const DEFAULT_HSTS_MAX_AGE: u64 = 31_536_000;

pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    headers.insert(HeaderName::from_static("x-content-type-options"), HeaderValue::from_static("nosniff"));
    headers.insert(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"));
    headers.insert(HeaderName::from_static("referrer-policy"), HeaderValue::from_static("no-referrer"));
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    if let Some(sec) = cfg.security.as_ref() {
        if sec.enable_hsts.unwrap_or(false) {
            let value = format!("max-age={}", sec.hsts_max_age.unwrap_or(DEFAULT_HSTS_MAX_AGE));
            if let Ok(val) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static("strict-transport-security"), val);
            }
        }
        if let Some(csp) = sec.csp.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            match HeaderValue::from_str(csp) {
                Ok(val) => {
                    headers.insert(HeaderName::from_static("content-security-policy"), val);
                }
                Err(e) => tracing::warn!("Ignoring invalid CSP header value: {}", e),
            }
        }
    }

    // Listings and booking views change with every write.
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    res
}
