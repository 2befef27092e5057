// Sign-in and password-reset flows built on one OTP gate.
//
// RESOLVE -> VERIFY_PASSWORD -> [OTP gate] -> ISSUE_SESSION
//                               no code  -> issue OTP, Err(OtpRequired)
//                               code     -> validate, Err(OtpInvalidOrExpired) on failure

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::delivery::{OtpMailer, OtpPurpose};
use crate::auth::otp::{OtpPolicy, OtpService};
use crate::auth::password::DummyHash;
use crate::auth::session::{SessionIssuer, SessionPrincipal, SessionToken};
use crate::auth::{password, resolver, AuthError};
use crate::models::account::Account;
use crate::store::AccountStore;

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    #[serde(flatten)]
    pub token: SessionToken,
    pub session: SessionPrincipal,
}

/// Outcome of an explicit resend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resend {
    Sent,
    /// The role signs in without a code; nothing was issued.
    NotRequired,
}

pub struct Authenticator {
    accounts: Arc<dyn AccountStore>,
    otp: OtpService,
    sessions: SessionIssuer,
    dummy: DummyHash,
    bcrypt_cost: u32,
}

impl Authenticator {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn OtpMailer>,
        policy: OtpPolicy,
        sessions: SessionIssuer,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            otp: OtpService::new(accounts.clone(), mailer, policy),
            accounts,
            sessions,
            dummy: DummyHash::new(bcrypt_cost),
            bcrypt_cost,
        }
    }

    /// Builds the dummy hash ahead of the first request.
    pub async fn prepare(&self) -> Result<(), AuthError> {
        self.dummy.get().await.map(|_| ())
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// The OTP step shared by every entry point. Sign-in follows the role policy;
    /// password reset always demands a code.
    pub async fn challenge(
        &self,
        account: &Account,
        submitted: Option<&str>,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if purpose == OtpPurpose::SignIn && !self.otp.policy().requires_otp(account.role) {
            return Ok(());
        }
        match submitted.filter(|s| !s.trim().is_empty()) {
            None => {
                self.otp.issue(account, purpose, now).await?;
                Err(AuthError::OtpRequired)
            }
            Some(code) => self.otp.validate(account, code, now).await,
        }
    }

    /// Resolves the identifier and checks the password. Unknown accounts and wrong
    /// passwords are indistinguishable to the caller.
    async fn authenticate(&self, identifier: &str, password: &str) -> Result<Account, AuthError> {
        let account = match resolver::resolve(self.accounts.as_ref(), identifier).await {
            Ok(account) => account,
            Err(AuthError::InvalidCredentials) => {
                self.dummy.burn(password).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !password::verify(password, &account.password_hash).await {
            warn!(account_id = %account.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(account)
    }

    /// Credential sign-in. Without `otp` (and when the role requires one) a code is sent
    /// and `OtpRequired` returned; calling again without `otp` re-sends.
    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
        otp: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SignedIn, AuthError> {
        let account = self.authenticate(identifier, password).await?;
        self.challenge(&account, otp, OtpPurpose::SignIn, now)
            .await?;

        let session = SessionPrincipal::from(&account);
        let token = self.sessions.issue(&session, now)?;
        info!(account_id = %account.id, role = %account.role, "Signed in");
        Ok(SignedIn { token, session })
    }

    /// Re-issues the sign-in code after checking credentials. Never opens a session.
    pub async fn resend_otp(
        &self,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Resend, AuthError> {
        let account = self.authenticate(identifier, password).await?;
        match self.challenge(&account, None, OtpPurpose::SignIn, now).await {
            Ok(()) => Ok(Resend::NotRequired),
            Err(AuthError::OtpRequired) => Ok(Resend::Sent),
            Err(e) => Err(e),
        }
    }

    /// First step of password reset: always sends a code. An unknown identifier gets the
    /// same `OtpRequired` answer with nothing issued.
    pub async fn request_password_reset(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let account = match resolver::resolve(self.accounts.as_ref(), identifier).await {
            Ok(account) => account,
            Err(AuthError::InvalidCredentials) => {
                debug!("Password reset requested for an unknown identifier");
                return Err(AuthError::OtpRequired);
            }
            Err(e) => return Err(e),
        };
        self.challenge(&account, None, OtpPurpose::PasswordReset, now)
            .await
    }

    /// Second step of password reset: redeem the code, then store the new hash.
    pub async fn confirm_password_reset(
        &self,
        identifier: &str,
        otp: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        password::check_policy(new_password)?;
        let account = match resolver::resolve(self.accounts.as_ref(), identifier).await {
            Ok(account) => account,
            Err(AuthError::InvalidCredentials) => return Err(AuthError::OtpInvalidOrExpired),
            Err(e) => return Err(e),
        };
        if otp.trim().is_empty() {
            return Err(AuthError::OtpInvalidOrExpired);
        }
        self.challenge(&account, Some(otp), OtpPurpose::PasswordReset, now)
            .await?;

        let hash = password::hash(new_password, self.bcrypt_cost).await?;
        self.accounts.update_password_hash(account.id, &hash).await?;
        info!(account_id = %account.id, "Password reset");
        Ok(())
    }
}
