//! # Spotbook Backend Library
//!
//! REST backend for a vacation-rental marketplace: users list spots, other
//! users book date ranges on them, leave one review per spot and attach
//! images.
//!
//! ## Architecture
//!
//! - **Axum** for routing and middleware
//! - **SQLx** over SQLite behind the [`store::SpotStore`] gateway
//! - **Tokio** runtime, **Serde** for the JSON API
//!
//! ## Core Components
//!
//! - [`booking`]: booking conflicts, ownership checks, rating aggregation
//! - [`store`]: persistence gateway trait and its SQLite implementation
//! - [`auth`]: password hashing and signed session tokens
//! - [`config`]: layered configuration
//! - [`db`]: schema initialization
//! - [`error`]: error type and JSON error responses
//! - [`metrics`]: business counters
//! - [`middleware`]: authentication, validation, rate limiting, headers
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: shared application state
//! - [`types`]: entities, request bodies and response views

pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
