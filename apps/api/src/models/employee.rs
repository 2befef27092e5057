use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Employees may edit their own profile for this many calendar months after creation.
pub const PROFILE_LOCK_MONTHS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeProfile {
    pub account_id: Uuid,
    pub cadre_id: i32,
    pub full_name: String,
    pub designation: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeProfile {
    /// The instant from which self-service updates are refused.
    pub fn locks_at(&self) -> DateTime<Utc> {
        self.created_at
            .checked_add_months(Months::new(PROFILE_LOCK_MONTHS))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        now >= self.locks_at()
    }
}

/// Fields an employee may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub designation: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.designation.is_none()
            && self.date_of_birth.is_none()
            && self.address.is_none()
    }

    pub fn apply_to(&self, profile: &mut EmployeeProfile, now: DateTime<Utc>) {
        if let Some(name) = &self.full_name {
            profile.full_name = name.clone();
        }
        if let Some(designation) = &self.designation {
            profile.designation = designation.clone();
        }
        if let Some(dob) = self.date_of_birth {
            profile.date_of_birth = Some(dob);
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
        profile.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile_created(at: DateTime<Utc>) -> EmployeeProfile {
        EmployeeProfile {
            account_id: Uuid::new_v4(),
            cadre_id: 1,
            full_name: "R. Sharma".to_string(),
            designation: "Section Officer".to_string(),
            date_of_birth: None,
            address: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_lock_uses_calendar_months() {
        let created = Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap();
        let profile = profile_created(created);
        // Feb has no 30th; chrono clamps to the last day of the month.
        assert_eq!(
            profile.locks_at(),
            Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_profile_locked_at_boundary() {
        let created = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let profile = profile_created(created);
        let boundary = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
        assert!(!profile.is_locked(boundary - chrono::Duration::seconds(1)));
        assert!(profile.is_locked(boundary));
    }

    #[test]
    fn test_apply_update_touches_only_given_fields() {
        let created = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let mut profile = profile_created(created);
        let update = ProfileUpdate {
            address: Some("12 Civil Lines".to_string()),
            ..Default::default()
        };
        let now = created + chrono::Duration::days(1);
        update.apply_to(&mut profile, now);
        assert_eq!(profile.full_name, "R. Sharma");
        assert_eq!(profile.address.as_deref(), Some("12 Civil Lines"));
        assert_eq!(profile.updated_at, now);
    }

    #[test]
    fn test_empty_update_detected() {
        assert!(ProfileUpdate::default().is_empty());
    }
}
