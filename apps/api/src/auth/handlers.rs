use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::flow::{Resend, SignedIn};
use crate::auth::{AuthSession, SessionPrincipal};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub identifier: String,
    pub otp: String,
    pub new_password: String,
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignedIn>, AppError> {
    let signed_in = state
        .auth
        .sign_in(&req.identifier, &req.password, req.otp.as_deref(), Utc::now())
        .await?;
    Ok(Json(signed_in))
}

/// POST /api/v1/auth/otp/resend
///
/// 202 when a fresh code went out, 204 when the role signs in without one.
pub async fn handle_resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendRequest>,
) -> Result<StatusCode, AppError> {
    let resent = state
        .auth
        .resend_otp(&req.identifier, &req.password, Utc::now())
        .await?;
    Ok(match resent {
        Resend::Sent => StatusCode::ACCEPTED,
        Resend::NotRequired => StatusCode::NO_CONTENT,
    })
}

/// POST /api/v1/auth/password-reset
pub async fn handle_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<StatusCode, AppError> {
    state
        .auth
        .request_password_reset(&req.identifier, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/password-reset/confirm
pub async fn handle_password_reset_confirm(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<StatusCode, AppError> {
    state
        .auth
        .confirm_password_reset(&req.identifier, &req.otp, &req.new_password, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/session
pub async fn handle_session(AuthSession(principal): AuthSession) -> Json<SessionPrincipal> {
    Json(principal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_request_otp_is_optional() {
        let req: SignInRequest = serde_json::from_value(serde_json::json!({
            "identifier": "123456/IAS/7",
            "password": "pw"
        }))
        .unwrap();
        assert!(req.otp.is_none());
    }

    #[test]
    fn test_reset_confirm_requires_otp() {
        let result: Result<PasswordResetConfirm, _> = serde_json::from_value(serde_json::json!({
            "identifier": "a@b.gov",
            "new_password": "whatever123"
        }));
        assert!(result.is_err());
    }
}
