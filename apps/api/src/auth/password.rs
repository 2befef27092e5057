// bcrypt hashing and verification. Both are CPU-bound and run on the blocking pool.

use tokio::sync::OnceCell;
use tracing::{error, warn};

use crate::auth::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Accepted bcrypt work factors.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

const DUMMY_PASSWORD: &str = "gems-dummy-password";

/// Hash checked when no account matched, so "unknown account" and "wrong password"
/// cost the same bcrypt work. Built once, on the blocking pool, at the configured cost.
pub struct DummyHash {
    cost: u32,
    hash: OnceCell<String>,
}

impl DummyHash {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            hash: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&str, AuthError> {
        self.hash
            .get_or_try_init(|| hash(DUMMY_PASSWORD, self.cost))
            .await
            .map(String::as_str)
    }

    /// Spends one bcrypt verification and discards the result.
    pub async fn burn(&self, password: &str) {
        match self.get().await {
            Ok(dummy) => {
                let _ = verify(password, dummy).await;
            }
            Err(e) => error!("Dummy hash unavailable: {e}"),
        }
    }
}

/// Returns true when `password` matches `hash`. A malformed hash counts as a mismatch.
pub fn verify_sync(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Stored password hash could not be checked: {e}");
            false
        }
    }
}

pub async fn verify(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || verify_sync(&password, &hash)).await {
        Ok(matched) => matched,
        Err(e) => {
            error!("Password verification task failed: {e}");
            false
        }
    }
}

pub async fn hash(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Length policy for newly chosen passwords.
pub fn check_policy(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordPolicy(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AuthError::PasswordPolicy(format!(
            "must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
