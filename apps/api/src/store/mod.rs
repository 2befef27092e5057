// Persistence seam for accounts, cadres and employee profiles.
//
// `AppState` carries the stores as `Arc<dyn ...>` so the auth flow can run against
// PostgreSQL in production and the in-memory store in tests.
//
// OTP state is only ever changed through `set_otp` / `consume_otp`, each of which is a
// single atomic update on the account row.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::cadre::Cadre;
use crate::models::employee::{EmployeeProfile, ProfileUpdate};

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt account record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result of an atomic OTP check-and-clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Code matched before expiry; pending OTP cleared.
    Consumed,
    /// A pending OTP exists but the code was wrong or expired. Attempt counted.
    Rejected { attempts: i32 },
    /// The attempt cap was reached; pending OTP cleared.
    Exhausted,
    /// Nothing pending for this account.
    NothingPending,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up an EMPLOYEE-role account by structured employee identifier.
    async fn find_employee_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Looks up a non-EMPLOYEE account by (lowercased) email.
    async fn find_non_employee_by_email(&self, email: &str)
        -> Result<Option<Account>, StoreError>;

    /// Whether an EMPLOYEE-role account owns this (lowercased) email.
    async fn employee_exists_with_email(&self, email: &str) -> Result<bool, StoreError>;

    /// Overwrites any pending OTP and resets the attempt counter.
    async fn set_otp(
        &self,
        account_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Compares `code` against the pending OTP and clears it on success.
    async fn consume_otp(
        &self,
        account_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<OtpCheck, StoreError>;

    async fn update_password_hash(&self, account_id: Uuid, hash: &str)
        -> Result<(), StoreError>;
}

/// Everything needed to create an EMPLOYEE account and its profile.
/// The employee identifier is minted by the store from the cadre sequence.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub cadre_id: i32,
    pub email: String,
    pub username: String,
    pub phone: String,
    pub password_hash: String,
    pub full_name: String,
    pub designation: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredEmployee {
    pub account_id: Uuid,
    pub employee_id: String,
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn list_cadres(&self) -> Result<Vec<Cadre>, StoreError>;

    /// Mints the next identifier for the cadre and creates account + profile atomically.
    async fn register_employee(
        &self,
        employee: &NewEmployee,
        now: DateTime<Utc>,
    ) -> Result<RegisteredEmployee, StoreError>;

    async fn find_profile(&self, account_id: Uuid)
        -> Result<Option<EmployeeProfile>, StoreError>;

    async fn update_profile(
        &self,
        account_id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<EmployeeProfile, StoreError>;
}
