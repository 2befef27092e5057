use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::password;
use crate::auth::SessionPrincipal;
use crate::errors::AppError;
use crate::models::account::Role;
use crate::models::employee::{EmployeeProfile, ProfileUpdate};
use crate::store::{EmployeeStore, NewEmployee, RegisteredEmployee};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterEmployeeRequest {
    pub cadre_id: i32,
    pub email: String,
    pub username: String,
    pub phone: String,
    pub password: String,
    pub full_name: String,
    pub designation: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
}

impl RegisterEmployeeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::Validation("email is not a valid address".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("full_name is required".to_string()));
        }
        if self.designation.trim().is_empty() {
            return Err(AppError::Validation("designation is required".to_string()));
        }
        if !is_valid_phone(&self.phone) {
            return Err(AppError::Validation(
                "phone must be a 10-digit mobile number".to_string(),
            ));
        }
        password::check_policy(&self.password)
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.trim().trim_start_matches("+91");
    digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Creates an EMPLOYEE account with a freshly minted employee identifier.
pub async fn register_employee(
    store: &dyn EmployeeStore,
    actor: &SessionPrincipal,
    req: &RegisterEmployeeRequest,
    bcrypt_cost: u32,
    now: DateTime<Utc>,
) -> Result<RegisteredEmployee, AppError> {
    if !actor.role.can_register_employees() {
        warn!(account_id = %actor.account_id, role = %actor.role, "Registration refused");
        return Err(AppError::Forbidden);
    }
    req.validate()?;

    let password_hash = password::hash(&req.password, bcrypt_cost).await?;
    let employee = NewEmployee {
        cadre_id: req.cadre_id,
        email: req.email.trim().to_lowercase(),
        username: req.username.trim().to_string(),
        phone: req.phone.trim().to_string(),
        password_hash,
        full_name: req.full_name.trim().to_string(),
        designation: req.designation.trim().to_string(),
        date_of_birth: req.date_of_birth,
        address: req.address.clone(),
    };

    let registered = store.register_employee(&employee, now).await?;
    info!(
        "Employee {} registered by {}",
        registered.employee_id, actor.account_id
    );
    Ok(registered)
}

/// Applies an employee's own profile edit unless the lock window has passed.
pub async fn update_own_profile(
    store: &dyn EmployeeStore,
    actor: &SessionPrincipal,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> Result<EmployeeProfile, AppError> {
    if actor.role != Role::Employee {
        return Err(AppError::Forbidden);
    }
    if update.is_empty() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }

    let profile = store
        .find_profile(actor.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee profile not found".to_string()))?;

    if profile.is_locked(now) {
        return Err(AppError::ProfileLocked {
            locked_since: profile.locks_at(),
        });
    }

    Ok(store.update_profile(actor.account_id, update, now).await?)
}
