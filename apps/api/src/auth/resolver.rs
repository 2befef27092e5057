// Maps a login identifier onto an account.
//
// Employee-ID-shaped identifiers search EMPLOYEE accounts only; everything else is
// treated as an email and searches non-EMPLOYEE accounts. An email miss that belongs
// to an employee yields `EmployeeIdRequired` so the client can ask for the structured ID.

use crate::auth::identifier::Identifier;
use crate::auth::AuthError;
use crate::models::account::Account;
use crate::store::AccountStore;

pub async fn resolve(store: &dyn AccountStore, raw: &str) -> Result<Account, AuthError> {
    let identifier = Identifier::parse(raw).ok_or(AuthError::InvalidCredentials)?;

    match identifier {
        Identifier::EmployeeId(employee_id) => store
            .find_employee_by_employee_id(&employee_id)
            .await?
            .ok_or(AuthError::InvalidCredentials),
        Identifier::Email(email) => {
            if let Some(account) = store.find_non_employee_by_email(&email).await? {
                return Ok(account);
            }
            if store.employee_exists_with_email(&email).await? {
                Err(AuthError::EmployeeIdRequired)
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
