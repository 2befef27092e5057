// OTP issuance and validation.
//
// Issuance: random 6-digit code, persisted with expiry (overwriting any pending one),
// then fanned out to SMS and email. Email failure fails the call; SMS cannot fail.
// Validation: one atomic check-and-clear in the store, with an attempt cap.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::auth::delivery::{OtpMailer, OtpMessage, OtpPurpose, SmsStub};
use crate::auth::AuthError;
use crate::models::account::{Account, Role};
use crate::store::{AccountStore, OtpCheck};

pub const OTP_LENGTH: usize = 6;
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;
pub const DEFAULT_OTP_MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
    /// Roles that sign in without an OTP. Empty by default.
    pub exempt_roles: HashSet<Role>,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_OTP_TTL_MINUTES),
            max_attempts: DEFAULT_OTP_MAX_ATTEMPTS,
            exempt_roles: HashSet::new(),
        }
    }
}

impl OtpPolicy {
    pub fn requires_otp(&self, role: Role) -> bool {
        !self.exempt_roles.contains(&role)
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }
}

/// Uniform over 000000..=999999, zero-padded.
pub fn generate_code() -> String {
    format_code(rand::thread_rng().gen_range(0..1_000_000))
}

fn format_code(n: u32) -> String {
    format!("{n:0width$}", width = OTP_LENGTH)
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub struct OtpService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn OtpMailer>,
    sms: SmsStub,
    policy: OtpPolicy,
}

impl OtpService {
    pub fn new(store: Arc<dyn AccountStore>, mailer: Arc<dyn OtpMailer>, policy: OtpPolicy) -> Self {
        Self {
            store,
            mailer,
            sms: SmsStub,
            policy,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Persists a fresh OTP for the account and delivers it.
    pub async fn issue(
        &self,
        account: &Account,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let code = generate_code();
        let expires_at = self.policy.expiry_from(now);
        self.store.set_otp(account.id, &code, expires_at).await?;

        self.sms.send_otp(&account.phone, &code);

        let message = OtpMessage {
            purpose,
            to: &account.email,
            username: &account.username,
            code: &code,
            valid_minutes: self.policy.ttl.num_minutes(),
        };
        if let Err(e) = self.mailer.send_otp(&message).await {
            warn!(account_id = %account.id, "OTP email delivery failed: {e}");
            return Err(AuthError::OtpDelivery(e));
        }

        info!(account_id = %account.id, %expires_at, "OTP issued");
        Ok(())
    }

    /// Redeems `submitted` against the pending OTP. Succeeds at most once per issued code.
    pub async fn validate(
        &self,
        account: &Account,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let submitted = submitted.trim();
        if !is_well_formed(submitted) {
            return Err(AuthError::OtpInvalidOrExpired);
        }

        match self
            .store
            .consume_otp(account.id, submitted, now, self.policy.max_attempts)
            .await?
        {
            OtpCheck::Consumed => Ok(()),
            OtpCheck::Rejected { attempts } => {
                warn!(account_id = %account.id, attempts, "OTP rejected");
                Err(AuthError::OtpInvalidOrExpired)
            }
            OtpCheck::Exhausted => {
                warn!(account_id = %account.id, "OTP attempt cap reached; pending code cleared");
                Err(AuthError::OtpAttemptsExceeded)
            }
            OtpCheck::NothingPending => Err(AuthError::OtpInvalidOrExpired),
        }
    }
}
