use super::ip::client_ip;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::state::AppState;

/// A thread-safe sliding-window rate limiter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allows `max_requests` per client within any `window_seconds` span.
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Records a request from `ip`, or rejects it with [`AppError::RateLimited`].
    pub async fn check_rate_limit(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let timestamps = requests.entry(ip).or_default();

        // On clock skew keep the timestamp; never let a backwards jump free up slots.
        timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = match now.checked_duration_since(oldest) {
                Some(elapsed) => self.window.saturating_sub(elapsed),
                None => Duration::from_secs(1),
            };
            // Round up so clients never retry a moment too early.
            let retry_after_seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return Err(AppError::RateLimited { retry_after_seconds });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops expired timestamps and forgets clients with none left.
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Global per-IP limit applied to every request.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.server.trust_proxy);
    match state.global_limiter.check_rate_limit(ip).await {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(%ip, "global rate limit exceeded");
            err.into_response()
        }
    }
}

/// Named limiters for individual endpoints (login, booking creation).
#[derive(Clone, Default)]
pub struct EndpointRateLimiter {
    limiters: Arc<HashMap<String, RateLimiter>>,
}

impl EndpointRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces limits given as `(endpoint, max_requests, window_seconds)`.
    pub fn with_limits(self, limits: Vec<(&str, usize, u64)>) -> Self {
        let mut map = Arc::try_unwrap(self.limiters).unwrap_or_else(|shared| (*shared).clone());
        for (endpoint, max_requests, window_seconds) in limits {
            map.insert(endpoint.to_string(), RateLimiter::new(max_requests, window_seconds));
        }
        Self { limiters: Arc::new(map) }
    }

    /// Endpoints without a configured limit are always allowed.
    pub async fn check_endpoint_limit(&self, endpoint: &str, ip: IpAddr) -> Result<(), AppError> {
        match self.limiters.get(endpoint) {
            Some(limiter) => limiter.check_rate_limit(ip).await,
            None => Ok(()),
        }
    }

    pub async fn cleanup_all(&self) {
        for limiter in self.limiters.values() {
            limiter.cleanup_old_entries().await;
        }
    }
}
