use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Profile locked since {locked_since}")]
    ProfileLocked { locked_since: DateTime<Utc> },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(what) => AppError::Conflict(what),
            other => AppError::Store(other),
        }
    }
}

fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::InvalidCredentials
        | AuthError::EmployeeIdRequired
        | AuthError::OtpRequired
        | AuthError::OtpInvalidOrExpired => StatusCode::UNAUTHORIZED,
        AuthError::OtpAttemptsExceeded => StatusCode::TOO_MANY_REQUESTS,
        AuthError::PasswordPolicy(_) => StatusCode::BAD_REQUEST,
        AuthError::OtpDelivery(_) => StatusCode::BAD_GATEWAY,
        AuthError::Hashing(_) | AuthError::Token(_) | AuthError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::ProfileLocked { .. } => (
                StatusCode::FORBIDDEN,
                "PROFILE_LOCKED",
                self.to_string(),
            ),
            AppError::Auth(e) => {
                let status = auth_status(e);
                let message = match e {
                    AuthError::OtpDelivery(inner) => {
                        tracing::error!("OTP delivery error: {inner}");
                        "The verification code could not be delivered".to_string()
                    }
                    _ if status.is_server_error() => {
                        tracing::error!("Auth error: {e}");
                        "An internal server error occurred".to_string()
                    }
                    _ => e.to_string(),
                };
                (status, e.code(), message)
            }
            AppError::Store(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
