use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::fmt::Write as _;

const READY_TIMEOUT_SECS: u64 = 5;

// Liveness: no I/O
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness: store round trip, bounded so a wedged database cannot hang the probe
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let ping = state.store.ping();
    match tokio::time::timeout(std::time::Duration::from_secs(READY_TIMEOUT_SECS), ping).await {
        Ok(Ok(())) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

// Prometheus text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let counters = [
        ("spots_created", "Spots created", m.spots_created),
        ("spots_deleted", "Spots deleted", m.spots_deleted),
        ("bookings_created", "Bookings created", m.bookings_created),
        ("bookings_rejected", "Booking requests rejected by the validator", m.bookings_rejected),
        ("reviews_created", "Reviews created", m.reviews_created),
        ("reviews_rejected", "Review requests rejected by the validator", m.reviews_rejected),
        ("images_uploaded", "Spot and review images attached", m.images_uploaded),
        ("signups", "Accounts created", m.signups),
        ("logins", "Successful logins", m.logins),
        ("login_failures", "Failed logins", m.login_failures),
    ];

    let mut body = String::new();
    for (name, help, value) in counters {
        let _ = write!(
            body,
            "# HELP spotbook_{name} {help}\n# TYPE spotbook_{name} counter\nspotbook_{name} {value}\n"
        );
    }
    let _ = write!(
        body,
        "# HELP spotbook_uptime_seconds Uptime seconds\n# TYPE spotbook_uptime_seconds gauge\nspotbook_uptime_seconds {}\n",
        m.uptime_seconds
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
