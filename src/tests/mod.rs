//! Integration and unit tests for the spotbook backend.
//!
//! - **support**: temp-file SQLite fixtures, seeding and a `oneshot` helper
//! - **booking_tests**: booking and review rules against a real store
//! - **api_tests**: end-to-end requests through the full router
//! - **error_tests**: status mapping, error bodies, development detail
//! - **config_tests**: defaults and validation
//! - **db_tests**: schema, overlap trigger, constraints and cascades
//! - **health_api_tests**: health, readiness, metrics and version endpoints

pub mod support;

pub mod booking_tests;
pub mod db_tests;
pub mod error_tests;
pub mod health_api_tests;
