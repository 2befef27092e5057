use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Account roles. Stored as their SCREAMING_SNAKE_CASE name in `accounts.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Employee,
    CadreControllingAuthority,
    Cm,
    Cs,
    Dop,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Employee,
        Role::CadreControllingAuthority,
        Role::Cm,
        Role::Cs,
        Role::Dop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Employee => "EMPLOYEE",
            Role::CadreControllingAuthority => "CADRE_CONTROLLING_AUTHORITY",
            Role::Cm => "CM",
            Role::Cs => "CS",
            Role::Dop => "DOP",
        }
    }

    /// Roles allowed to register new employees.
    pub fn can_register_employees(&self) -> bool {
        matches!(self, Role::Admin | Role::CadreControllingAuthority)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Raw `accounts` row as stored in PostgreSQL.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub employee_id: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub username: String,
    pub phone: String,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_attempts: i32,
}

/// An OTP waiting to be confirmed. Code and expiry only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingOtp {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub employee_id: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub username: String,
    pub phone: String,
    pub pending_otp: Option<PendingOtp>,
    pub otp_attempts: i32,
}

impl Account {
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = UnknownRole;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>()?;
        // A half-written pair is treated as no pending OTP.
        let pending_otp = match (row.otp_code, row.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some(PendingOtp { code, expires_at }),
            _ => None,
        };
        Ok(Account {
            id: row.id,
            email: row.email,
            employee_id: row.employee_id,
            password_hash: row.password_hash,
            role,
            username: row.username,
            phone: row.phone,
            pending_otp,
            otp_attempts: row.otp_attempts,
        })
    }
}
