// In-memory store used by the unit tests. A single mutex guards all state, which
// gives `set_otp` / `consume_otp` the same atomicity as the SQL statements.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::identifier::compose_employee_id;
use crate::models::account::{Account, PendingOtp, Role};
use crate::models::cadre::Cadre;
use crate::models::employee::{EmployeeProfile, ProfileUpdate};
use crate::store::{
    AccountStore, EmployeeStore, NewEmployee, OtpCheck, RegisteredEmployee, StoreError,
};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    cadres: HashMap<i32, Cadre>,
    profiles: HashMap<Uuid, EmployeeProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: Account) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(account.id, account);
    }

    pub fn insert_cadre(&self, cadre: Cadre) {
        self.inner.lock().unwrap().cadres.insert(cadre.id, cadre);
    }

    pub fn account(&self, id: Uuid) -> Option<Account> {
        self.inner.lock().unwrap().accounts.get(&id).cloned()
    }

    pub fn cadre(&self, id: i32) -> Option<Cadre> {
        self.inner.lock().unwrap().cadres.get(&id).cloned()
    }

    fn find(&self, pred: impl Fn(&Account) -> bool) -> Option<Account> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .values()
            .find(|a| pred(a))
            .cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_employee_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.find(|a| a.is_employee() && a.employee_id.as_deref() == Some(employee_id)))
    }

    async fn find_non_employee_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.find(|a| !a.is_employee() && a.email.to_lowercase() == email))
    }

    async fn employee_exists_with_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .find(|a| a.is_employee() && a.email.to_lowercase() == email)
            .is_some())
    }

    async fn set_otp(
        &self,
        account_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;
        account.pending_otp = Some(PendingOtp {
            code: code.to_string(),
            expires_at,
        });
        account.otp_attempts = 0;
        Ok(())
    }

    async fn consume_otp(
        &self,
        account_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<OtpCheck, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(account) = inner.accounts.get_mut(&account_id) else {
            return Ok(OtpCheck::NothingPending);
        };
        let Some(pending) = &account.pending_otp else {
            return Ok(OtpCheck::NothingPending);
        };

        if pending.code == code && pending.is_live(now) {
            account.pending_otp = None;
            account.otp_attempts = 0;
            return Ok(OtpCheck::Consumed);
        }

        account.otp_attempts += 1;
        if account.otp_attempts >= max_attempts {
            account.pending_otp = None;
            return Ok(OtpCheck::Exhausted);
        }
        Ok(OtpCheck::Rejected {
            attempts: account.otp_attempts,
        })
    }

    async fn update_password_hash(
        &self,
        account_id: Uuid,
        hash: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::NotFound(format!("Account {account_id}")))?;
        account.password_hash = hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn list_cadres(&self) -> Result<Vec<Cadre>, StoreError> {
        let mut cadres: Vec<Cadre> = self.inner.lock().unwrap().cadres.values().cloned().collect();
        cadres.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(cadres)
    }

    async fn register_employee(
        &self,
        employee: &NewEmployee,
        now: DateTime<Utc>,
    ) -> Result<RegisteredEmployee, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let email = employee.email.to_lowercase();
        if inner.accounts.values().any(|a| a.email.to_lowercase() == email) {
            return Err(StoreError::Conflict("Account already exists".to_string()));
        }

        let cadre = inner
            .cadres
            .get_mut(&employee.cadre_id)
            .ok_or_else(|| StoreError::NotFound(format!("Cadre {}", employee.cadre_id)))?;
        let sequence = cadre.next_sequence;
        cadre.next_sequence += 1;
        let employee_id = compose_employee_id(cadre.department_code, &cadre.code, sequence);

        let account_id = Uuid::new_v4();
        inner.accounts.insert(
            account_id,
            Account {
                id: account_id,
                email,
                employee_id: Some(employee_id.clone()),
                password_hash: employee.password_hash.clone(),
                role: Role::Employee,
                username: employee.username.clone(),
                phone: employee.phone.clone(),
                pending_otp: None,
                otp_attempts: 0,
            },
        );
        inner.profiles.insert(
            account_id,
            EmployeeProfile {
                account_id,
                cadre_id: employee.cadre_id,
                full_name: employee.full_name.clone(),
                designation: employee.designation.clone(),
                date_of_birth: employee.date_of_birth,
                address: employee.address.clone(),
                created_at: now,
                updated_at: now,
            },
        );

        Ok(RegisteredEmployee {
            account_id,
            employee_id,
        })
    }

    async fn find_profile(
        &self,
        account_id: Uuid,
    ) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(self.inner.lock().unwrap().profiles.get(&account_id).cloned())
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<EmployeeProfile, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile for account {account_id}")))?;
        update.apply_to(profile, now);
        Ok(profile.clone())
    }
}
