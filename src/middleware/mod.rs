//! Middleware components for HTTP request processing.
//!
//! Authentication restores the caller identity, validation turns raw input
//! into typed values, and the rest handle rate limiting, client
//! identification, response headers and development error detail.

pub mod auth;
pub mod errors;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use rate_limit::EndpointRateLimiter;
