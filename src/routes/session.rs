use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    auth::{hash_password, issue_token, verify_password},
    error::{AppError, AppResult, FieldErrors},
    middleware::auth::MaybeUser,
    middleware::ip::ClientIp,
    middleware::validation::{sanitize_for_logging, validate_login, validate_signup, AppJson},
    state::{AppState, SESSION_LIMIT_KEY},
    types::{LoginRequest, NewUser, SessionResponse, SignupRequest, User},
};

fn session_for(state: &AppState, user: User) -> AppResult<SessionResponse> {
    let auth = &state.config.auth;
    let token = issue_token(user.id, auth.token_secret.as_bytes(), auth.token_ttl_secs)?;
    Ok(SessionResponse { user: Some(user), token: Some(token) })
}

fn user_exists(field: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), format!("User with that {} already exists", field));
    AppError::Conflict { message: "User already exists".to_string(), errors }
}

/// A concurrent signup took the email or username between the check and the insert.
fn signup_conflict(err: AppError) -> AppError {
    match err {
        AppError::Conflict { errors, .. } if errors.contains_key("username") => user_exists("username"),
        AppError::Conflict { .. } => user_exists("email"),
        other => other,
    }
}

/// `POST /api/users`
pub async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    state.rate_limiter.check_endpoint_limit(SESSION_LIMIT_KEY, ip).await?;
    let input = validate_signup(req)?;

    if state.store.find_user_by_credential(&input.email).await?.is_some() {
        return Err(user_exists("email"));
    }
    if state.store.find_user_by_credential(&input.username).await?.is_some() {
        return Err(user_exists("username"));
    }

    let password_hash = hash_password(&input.password)?;
    let new_user = NewUser {
        first_name: input.first_name,
        last_name: input.last_name,
        email: input.email,
        username: input.username,
        password_hash,
    };
    let user = state.store.create_user(&new_user).await.map_err(signup_conflict)?;

    state.metrics.inc_signups();
    tracing::info!(user_id = user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

/// `POST /api/session`
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    state.rate_limiter.check_endpoint_limit(SESSION_LIMIT_KEY, ip).await?;
    let (credential, password) = validate_login(req)?;

    let found = state.store.find_user_by_credential(&credential).await?;
    let user = match found {
        Some(creds) if verify_password(&password, &creds.password_hash) => creds.user,
        _ => {
            state.metrics.inc_login_failures();
            tracing::warn!(%ip, credential = %sanitize_for_logging(&credential), "login failed");
            return Err(AppError::Unauthorized("The provided credentials were invalid.".to_string()));
        }
    };

    state.metrics.inc_logins();
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(session_for(&state, user)?))
}

/// `GET /api/session`
pub async fn current_session(MaybeUser(user): MaybeUser) -> Json<SessionResponse> {
    Json(SessionResponse { user, token: None })
}

/// `DELETE /api/session`. Tokens are stateless; the client discards its copy.
pub async fn logout(MaybeUser(user): MaybeUser) -> Json<Value> {
    if let Some(user) = user {
        tracing::debug!(user_id = user.id, "user logged out");
    }
    Json(json!({ "message": "success" }))
}
