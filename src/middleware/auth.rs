use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;

use crate::auth::verify_token;
use crate::error::AppError;
use crate::state::AppState;
use crate::types::User;

/// Caller identity restored from the bearer token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Restores the caller identity for every request.
///
/// Missing, invalid or expired tokens leave the request anonymous; only
/// routes that extract [`AuthUser`] turn that into a 401. A store failure
/// while loading the user is a real error and is returned as such.
pub async fn restore_user(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(&req) {
        match verify_token(token, state.config.auth.token_secret.as_bytes()) {
            Ok(claims) => match state.store.find_user_by_id(claims.sub).await? {
                Some(user) => {
                    req.extensions_mut().insert(CurrentUser(user));
                }
                None => tracing::warn!(user_id = claims.sub, "token refers to a deleted user"),
            },
            Err(e) => tracing::debug!("ignoring bearer token: {}", e),
        }
    }
    Ok(next.run(req).await)
}

/// Extractor for routes that require authentication.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|current| AuthUser(current.0.clone()))
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor for routes that behave differently for signed-in callers.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().map(|current| current.0.clone())))
    }
}
