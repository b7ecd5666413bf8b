use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::{EndpointRateLimiter, RateLimiter};
use crate::store::SpotStore;

/// Endpoint keys for [`EndpointRateLimiter`].
pub const SESSION_LIMIT_KEY: &str = "session";
pub const BOOKING_LIMIT_KEY: &str = "bookings";

/// The shared application state.
///
/// Cloned into every handler by axum. Everything a request needs is reachable
/// from here; there are no process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway. Tests may swap in any other implementation.
    pub store: Arc<dyn SpotStore>,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Per-endpoint limits for login/signup and booking creation.
    pub rate_limiter: EndpointRateLimiter,
    /// Limit applied to every request by the global middleware.
    pub global_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn SpotStore>, config: AppConfig) -> Self {
        let rl = &config.rate_limit;
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            (SESSION_LIMIT_KEY, rl.session_max_requests, rl.window_seconds),
            (BOOKING_LIMIT_KEY, rl.booking_max_requests, rl.window_seconds),
        ]);
        let global_limiter = RateLimiter::new(rl.max_requests, rl.window_seconds);

        Self { store, config: Arc::new(config), metrics: Metrics::new(), rate_limiter, global_limiter }
    }
}
