use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::identifier::compose_employee_id;
use crate::models::account::{Account, AccountRow};
use crate::models::cadre::Cadre;
use crate::models::employee::{EmployeeProfile, ProfileUpdate};
use crate::store::{
    AccountStore, EmployeeStore, NewEmployee, OtpCheck, RegisteredEmployee, StoreError,
};

const ACCOUNT_COLUMNS: &str = "id, email, employee_id, password_hash, role, username, phone, \
     otp_code, otp_expires_at, otp_attempts";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, sql: &str, bind: &str) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.map(into_account).transpose()
    }
}

fn into_account(row: AccountRow) -> Result<Account, StoreError> {
    let id = row.id;
    Account::try_from(row).map_err(|e| StoreError::Corrupt {
        id,
        reason: e.to_string(),
    })
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(format!("{what} already exists"));
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_employee_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE employee_id = $1 AND role = 'EMPLOYEE'"
        );
        self.find_one(&sql, employee_id).await
    }

    async fn find_non_employee_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = $1 AND role <> 'EMPLOYEE'"
        );
        self.find_one(&sql, email).await
    }

    async fn employee_exists_with_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE lower(email) = $1 AND role = 'EMPLOYEE')",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_otp(
        &self,
        account_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET otp_code = $2, otp_expires_at = $3, otp_attempts = 0 WHERE id = $1",
        )
        .bind(account_id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Account {account_id}")));
        }
        Ok(())
    }

    async fn consume_otp(
        &self,
        account_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> Result<OtpCheck, StoreError> {
        // Check-and-clear in one statement so a code can only ever be redeemed once.
        let consumed: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET otp_code = NULL, otp_expires_at = NULL, otp_attempts = 0
            WHERE id = $1 AND otp_code = $2 AND otp_expires_at > $3
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if consumed.is_some() {
            return Ok(OtpCheck::Consumed);
        }

        // Right-hand sides see the pre-update row, so the CASE compares the new count.
        let attempts: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET otp_attempts = otp_attempts + 1,
                otp_code = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE otp_code END,
                otp_expires_at = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE otp_expires_at END
            WHERE id = $1 AND otp_code IS NOT NULL
            RETURNING otp_attempts
            "#,
        )
        .bind(account_id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match attempts {
            None => OtpCheck::NothingPending,
            Some(n) if n >= max_attempts => OtpCheck::Exhausted,
            Some(n) => OtpCheck::Rejected { attempts: n },
        })
    }

    async fn update_password_hash(
        &self,
        account_id: Uuid,
        hash: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(account_id)
            .bind(hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Account {account_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for PgStore {
    async fn list_cadres(&self) -> Result<Vec<Cadre>, StoreError> {
        Ok(
            sqlx::query_as::<_, Cadre>("SELECT * FROM cadres ORDER BY code ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn register_employee(
        &self,
        employee: &NewEmployee,
        now: DateTime<Utc>,
    ) -> Result<RegisteredEmployee, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the cadre serialises concurrent registrations into one sequence.
        let minted: Option<(String, i32, i32)> = sqlx::query_as(
            r#"
            UPDATE cadres
            SET next_sequence = next_sequence + 1
            WHERE id = $1
            RETURNING code, department_code, next_sequence - 1
            "#,
        )
        .bind(employee.cadre_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (cadre_code, department_code, sequence) = minted
            .ok_or_else(|| StoreError::NotFound(format!("Cadre {}", employee.cadre_id)))?;
        let employee_id = compose_employee_id(department_code, &cadre_code, sequence);
        let account_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, email, employee_id, password_hash, role, username, phone, created_at)
            VALUES ($1, $2, $3, $4, 'EMPLOYEE', $5, $6, $7)
            "#,
        )
        .bind(account_id)
        .bind(employee.email.to_lowercase())
        .bind(&employee_id)
        .bind(&employee.password_hash)
        .bind(&employee.username)
        .bind(&employee.phone)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Account"))?;

        sqlx::query(
            r#"
            INSERT INTO employee_profiles
                (account_id, cadre_id, full_name, designation, date_of_birth, address,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(account_id)
        .bind(employee.cadre_id)
        .bind(&employee.full_name)
        .bind(&employee.designation)
        .bind(employee.date_of_birth)
        .bind(&employee.address)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Registered employee {employee_id} (account {account_id})");
        Ok(RegisteredEmployee {
            account_id,
            employee_id,
        })
    }

    async fn find_profile(
        &self,
        account_id: Uuid,
    ) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(sqlx::query_as::<_, EmployeeProfile>(
            "SELECT * FROM employee_profiles WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<EmployeeProfile, StoreError> {
        let updated: Option<EmployeeProfile> = sqlx::query_as(
            r#"
            UPDATE employee_profiles
            SET full_name = COALESCE($2, full_name),
                designation = COALESCE($3, designation),
                date_of_birth = COALESCE($4, date_of_birth),
                address = COALESCE($5, address),
                updated_at = $6
            WHERE account_id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(&update.full_name)
        .bind(&update.designation)
        .bind(update.date_of_birth)
        .bind(&update.address)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| StoreError::NotFound(format!("Profile for account {account_id}")))
    }
}
