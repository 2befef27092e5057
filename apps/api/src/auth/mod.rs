// Authentication core: identifier resolution, password check, OTP gate, sessions.
// Sign-in and password reset share one OTP gate (flow::Authenticator::challenge).

pub mod delivery;
pub mod flow;
pub mod handlers;
pub mod identifier;
pub mod otp;
pub mod password;
pub mod resolver;
pub mod session;

use thiserror::Error;

use crate::auth::delivery::MailError;
use crate::store::StoreError;

pub use flow::Authenticator;
pub use session::{AuthSession, SessionIssuer, SessionPrincipal};

/// Outcome taxonomy of the auth flow. The first five variants are the user-facing
/// signals; the rest are infrastructure failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Employees must sign in with their employee ID")]
    EmployeeIdRequired,

    #[error("A one-time passcode has been sent and must be submitted")]
    OtpRequired,

    #[error("Invalid or expired one-time passcode")]
    OtpInvalidOrExpired,

    #[error("Too many incorrect passcodes; request a new one")]
    OtpAttemptsExceeded,

    #[error("Password rejected: {0}")]
    PasswordPolicy(String),

    #[error("OTP delivery failed: {0}")]
    OtpDelivery(#[from] MailError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::EmployeeIdRequired => "EMPLOYEE_ID_REQUIRED",
            AuthError::OtpRequired => "OTP_REQUIRED",
            AuthError::OtpInvalidOrExpired => "OTP_INVALID_OR_EXPIRED",
            AuthError::OtpAttemptsExceeded => "OTP_ATTEMPTS_EXCEEDED",
            AuthError::PasswordPolicy(_) => "VALIDATION_ERROR",
            AuthError::OtpDelivery(_) => "OTP_DELIVERY_FAILED",
            AuthError::Hashing(_) | AuthError::Token(_) | AuthError::Store(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}
