//! Shared fixtures: a fresh SQLite database per test, seeded users and spots,
//! and a small request helper around `oneshot`.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::{hash_password, issue_token};
use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::{SpotStore, SqliteStore};
use crate::types::{NewUser, Spot, SpotInput, User};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: SqliteStore,
    // Keeps the database file alive for the duration of the test.
    _dir: TempDir,
}

pub async fn setup_test_db() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    (pool, dir)
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.token_secret = "integration-test-secret-0123456789".to_string();
    config
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config()).await
}

pub async fn setup_test_app_with(config: AppConfig) -> TestApp {
    let (pool, dir) = setup_test_db().await;
    let store = SqliteStore::new(pool);
    let state = AppState::new(Arc::new(store.clone()), config);
    let app = crate::routes::router(state.clone());
    TestApp { app, state, store, _dir: dir }
}

pub async fn seed_user(store: &dyn SpotStore, name: &str) -> User {
    store
        .create_user(&NewUser {
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            username: name.to_lowercase(),
            password_hash: hash_password(PASSWORD).unwrap(),
        })
        .await
        .unwrap()
}

pub fn spot_input(name: &str) -> SpotInput {
    SpotInput {
        address: "123 Disney Lane".to_string(),
        city: "San Francisco".to_string(),
        state: "California".to_string(),
        country: "United States of America".to_string(),
        lat: 37.7645358,
        lng: -122.4730327,
        name: name.to_string(),
        description: "Place where web developers are created".to_string(),
        price: 123.0,
    }
}

pub async fn seed_spot(store: &dyn SpotStore, owner_id: i64) -> Spot {
    store.create_spot(owner_id, &spot_input("App Academy")).await.unwrap()
}

pub fn token_for(state: &AppState, user_id: i64) -> String {
    let auth = &state.config.auth;
    issue_token(user_id, auth.token_secret.as_bytes(), auth.token_ttl_secs).unwrap()
}

/// Sends one request through the router and returns the status and JSON body
/// (`Value::Null` for empty or non-JSON bodies).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
