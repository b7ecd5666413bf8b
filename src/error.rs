use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// The primary error type for the application.
///
/// Every handler returns `AppResult<T>`; the `IntoResponse` impl turns a
/// rejection into the JSON error envelope the API documents.
#[derive(Debug)]
pub enum AppError {
    /// Unexpected failures. Details are logged, never sent to clients in production.
    Internal(anyhow::Error),
    /// Malformed input that is not tied to a single field.
    BadRequest(String),
    /// One or more request fields failed validation.
    Validation {
        message: String,
        errors: FieldErrors,
    },
    /// The caller is not authenticated.
    Unauthorized(String),
    /// The caller is authenticated but not allowed to perform the operation.
    Forbidden(String),
    /// The requested resource does not exist.
    NotFound(String),
    /// The request collides with existing state (overlapping booking, duplicate review).
    Conflict {
        message: String,
        errors: FieldErrors,
    },
    /// Too many requests from one client.
    RateLimited {
        retry_after_seconds: u64,
    },
    ServiceUnavailable(String),
    /// A database failure that is not a domain conflict.
    Database(String),
}

impl AppError {
    pub fn validation(errors: FieldErrors) -> Self {
        AppError::Validation { message: "Bad Request".to_string(), errors }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict { message: message.into(), errors: FieldErrors::new() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // Conflicts are authorization-class rejections in this API.
            AppError::Forbidden(_) | AppError::Conflict { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Validation { errors, .. } => {
                let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
                write!(f, "Validation failed for: {}", fields.join(", "))
            }
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Full error chain of a server-side failure, attached to the response so
/// the development-mode middleware can expose it.
#[derive(Debug, Clone)]
pub struct ErrorDebug(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut debug: Option<String> = None;

        let (code, message, errors, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                debug = Some(format!("{:?}", e));
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::Database(msg) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Database error: {}", msg);
                debug = Some(msg);
                (
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg, None, None),
            AppError::Validation { message, errors } => ("VALIDATION_ERROR", message, Some(errors), None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg, None, None),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg, None, None),
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None, None),
            AppError::Conflict { message, errors } => {
                let errors = if errors.is_empty() { None } else { Some(errors) };
                ("CONFLICT", message, errors, None)
            }
            AppError::RateLimited { retry_after_seconds } => (
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                None,
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ServiceUnavailable(msg) => ("SERVICE_UNAVAILABLE", msg, None, None),
        };

        let mut body = json!({
            "message": message,
            "error": {
                "code": code,
                "message": message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(errors) = errors {
            body["errors"] = json!(errors);
        }
        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(debug) = debug {
            response.extensions_mut().insert(ErrorDebug(debug));
        }
        response
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                if msg.contains(BOOKING_OVERLAP_MARKER) {
                    return booking_overlap();
                }
                if db_err.is_unique_violation() {
                    tracing::debug!(constraint = %msg, "unique constraint violated");
                    return unique_violation(&msg);
                }
                AppError::Database(format!("Database error: {}", msg))
            }
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(format!("Database error: {}", err)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Conflict for a duplicate row. A single-column constraint names its column
/// in `errors`; table names stay out of the response.
fn unique_violation(msg: &str) -> AppError {
    let mut errors = FieldErrors::new();
    let column = msg
        .strip_prefix("UNIQUE constraint failed: ")
        .filter(|columns| !columns.contains(','))
        .and_then(|column| column.rsplit('.').next())
        .map(str::trim)
        .filter(|column| !column.is_empty());
    if let Some(column) = column {
        errors.insert(column.to_string(), format!("{} already exists", column));
    }
    AppError::Conflict { message: "Record already exists".to_string(), errors }
}

/// Text raised by the `bookings_no_overlap` trigger.
pub const BOOKING_OVERLAP_MARKER: &str = "booking_overlap";

/// The rejection for a booking whose dates collide with an existing one.
pub fn booking_overlap() -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert("startDate".to_string(), "Start date conflicts with an existing booking".to_string());
    errors.insert("endDate".to_string(), "End date conflicts with an existing booking".to_string());
    AppError::Conflict {
        message: "Sorry, this spot is already booked for the specified dates".to_string(),
        errors,
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// Converts a missing row into a `NotFound` rejection naming the entity.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} couldn't be found", entity)))
    }
}
