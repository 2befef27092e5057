// Session principal and its JWT encoding, plus the `AuthSession` extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::errors::AppError;
use crate::models::account::{Account, Role};
use crate::state::AppState;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Identity handed to the HTTP layer after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    pub username: String,
    pub phone: String,
    pub employee_id: Option<String>,
}

impl From<&Account> for SessionPrincipal {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email.clone(),
            role: account.role,
            username: account.username.clone(),
            phone: account.phone.clone(),
            employee_id: account.employee_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    principal: SessionPrincipal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies HS256 session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(
        &self,
        principal: &SessionPrincipal,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: principal.account_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            principal: principal.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(SessionToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<SessionPrincipal, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims.principal)
    }
}

/// Extracts the principal from `Authorization: Bearer <token>`.
pub struct AuthSession(pub SessionPrincipal);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let principal = state.auth.sessions().verify(token).map_err(|e| {
            debug!("Session token rejected: {e}");
            AppError::Unauthorized
        })?;
        Ok(AuthSession(principal))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        http::{Request, StatusCode},
        response::IntoResponse,
    };

    use super::*;
    use crate::auth::delivery::testing::RecordingMailer;
    use crate::auth::otp::OtpPolicy;
    use crate::auth::password::MIN_BCRYPT_COST;
    use crate::auth::Authenticator;
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "test-secret";

    fn principal() -> SessionPrincipal {
        SessionPrincipal {
            account_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role: Role::Employee,
            username: "user".to_string(),
            phone: "9000000000".to_string(),
            employee_id: Some("123456/IAS/7".to_string()),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = SessionIssuer::new("test-secret", Duration::hours(1));
        let p = principal();
        let now = Utc::now();
        let token = issuer.issue(&p, now).unwrap();
        assert_eq!(token.expires_at, now + Duration::hours(1));
        assert_eq!(issuer.verify(&token.token).unwrap(), p);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = SessionIssuer::new("test-secret", Duration::hours(1));
        let token = issuer
            .issue(&principal(), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(
            issuer.verify(&token.token),
            Err(AuthError::Token(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = SessionIssuer::new("test-secret", Duration::hours(1));
        let other = SessionIssuer::new("other-secret", Duration::hours(1));
        let token = other.issue(&principal(), Utc::now()).unwrap();
        assert!(issuer.verify(&token.token).is_err());
    }

    fn state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let auth = Authenticator::new(
            store.clone(),
            Arc::new(RecordingMailer::default()),
            OtpPolicy::default(),
            SessionIssuer::new(SECRET, Duration::hours(1)),
            MIN_BCRYPT_COST,
        );
        AppState {
            auth: Arc::new(auth),
            employees: store,
        }
    }

    async fn extract(authorization: Option<&str>) -> Result<SessionPrincipal, AppError> {
        let mut request = Request::builder().uri("/api/v1/auth/session");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        AuthSession::from_request_parts(&mut parts, &state())
            .await
            .map(|AuthSession(principal)| principal)
    }

    fn bearer(issuer: &SessionIssuer, issued_at: DateTime<Utc>) -> String {
        format!("Bearer {}", issuer.issue(&principal(), issued_at).unwrap().token)
    }

    #[tokio::test]
    async fn test_extractor_accepts_valid_bearer_token() {
        let issuer = SessionIssuer::new(SECRET, Duration::hours(1));
        let p = principal();
        let header = format!("Bearer {}", issuer.issue(&p, Utc::now()).unwrap().token);
        assert_eq!(extract(Some(&header)).await.unwrap(), p);
    }

    #[tokio::test]
    async fn test_extractor_rejects_missing_header() {
        let err = extract(None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_extractor_rejects_non_bearer_scheme() {
        let err = extract(Some("Basic dXNlcjpwYXNz")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_extractor_rejects_token_signed_with_other_secret() {
        let other = SessionIssuer::new("other-secret", Duration::hours(1));
        let err = extract(Some(&bearer(&other, Utc::now()))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_extractor_rejects_expired_token() {
        let issuer = SessionIssuer::new(SECRET, Duration::hours(1));
        let header = bearer(&issuer, Utc::now() - Duration::hours(3));
        let err = extract(Some(&header)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
