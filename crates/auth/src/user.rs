//! Lab staff accounts.
//!
//! Users are directory records, not event-sourced: the role registry and the
//! credential store hold everything that changes independently.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult, Entity, UserId};

use crate::Identity;

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    /// User is active and can authenticate/transact.
    #[default]
    Active,
    /// User is suspended and cannot authenticate.
    Suspended,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl core::fmt::Display for Gender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// Encoded size cap for a profile picture (about 2 MiB of image data).
pub const MAX_PICTURE_LEN: usize = 2_800_000;
const MAX_PHONE_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 500;

/// Personal details a user maintains about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: String,
    pub address: String,
    /// Base64-encoded image.
    pub picture: Option<String>,
}

/// Partial profile edit. `None` leaves a field alone; an empty `picture`
/// removes the current one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub picture: Option<String>,
}

fn validate_picture(picture: &str) -> DomainResult<()> {
    if picture.len() > MAX_PICTURE_LEN {
        return Err(DomainError::invalid(format!(
            "profile picture exceeds {MAX_PICTURE_LEN} encoded bytes"
        )));
    }
    let base64 = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=');
    if !picture.bytes().all(base64) {
        return Err(DomainError::invalid("profile picture must be base64 encoded"));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> DomainResult<()> {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
    if phone.len() > MAX_PHONE_LEN || !phone.chars().all(allowed) {
        return Err(DomainError::invalid(format!("invalid phone number '{phone}'")));
    }
    Ok(())
}

/// # Invariants
/// - `employee_id` is non-empty and unique across the directory (enforced by the store).
/// - `role` names an existing role (enforced by the engine at creation time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub employee_id: String,
    pub name: String,
    pub role: String,
    pub status: UserStatus,
    #[serde(default)]
    pub profile: UserProfile,
}

impl User {
    pub fn new(
        employee_id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> DomainResult<Self> {
        let employee_id = employee_id.into().trim().to_string();
        let name = name.into().trim().to_string();
        let role = role.into().trim().to_string();

        if employee_id.is_empty() {
            return Err(DomainError::invalid("employee id cannot be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::invalid("name cannot be empty"));
        }
        if role.is_empty() {
            return Err(DomainError::invalid("role cannot be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            employee_id,
            name,
            role,
            status: UserStatus::Active,
            profile: UserProfile::default(),
        })
    }

    /// Apply `update`, returning the names of the fields that actually
    /// changed. Nothing is modified when validation fails.
    pub fn apply_profile(
        &mut self,
        update: &ProfileUpdate,
        today: NaiveDate,
    ) -> DomainResult<Vec<&'static str>> {
        let mut next = self.clone();
        let mut changed = Vec::new();

        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::invalid("name cannot be empty"));
            }
            if name != next.name {
                next.name = name.to_string();
                changed.push("name");
            }
        }
        if let Some(dob) = update.date_of_birth {
            if dob > today {
                return Err(DomainError::invalid(format!("date of birth {dob} is in the future")));
            }
            if next.profile.date_of_birth != Some(dob) {
                next.profile.date_of_birth = Some(dob);
                changed.push("date_of_birth");
            }
        }
        if let Some(gender) = update.gender {
            if next.profile.gender != Some(gender) {
                next.profile.gender = Some(gender);
                changed.push("gender");
            }
        }
        if let Some(phone) = &update.phone {
            let phone = phone.trim();
            validate_phone(phone)?;
            if phone != next.profile.phone {
                next.profile.phone = phone.to_string();
                changed.push("phone");
            }
        }
        if let Some(address) = &update.address {
            let address = address.trim();
            if address.chars().count() > MAX_ADDRESS_LEN {
                return Err(DomainError::invalid(format!(
                    "address exceeds {MAX_ADDRESS_LEN} characters"
                )));
            }
            if address != next.profile.address {
                next.profile.address = address.to_string();
                changed.push("address");
            }
        }
        if let Some(picture) = &update.picture {
            let picture = picture.trim();
            let picture = if picture.is_empty() {
                None
            } else {
                validate_picture(picture)?;
                Some(picture.to_string())
            };
            if picture != next.profile.picture {
                next.profile.picture = picture;
                changed.push("picture");
            }
        }

        *self = next;
        Ok(changed)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            employee_id: self.employee_id.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_and_trimmed() {
        let u = User::new(" E-17 ", "Asha", "assistant").unwrap();
        assert_eq!(u.employee_id, "E-17");
        assert!(u.is_active());
        assert_eq!(u.identity().role, "assistant");
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn profile_edits_report_only_real_changes() {
        let mut u = User::new("E-2", "Ravi", "assistant").unwrap();
        let update = ProfileUpdate {
            name: Some(" Ravi ".to_string()),
            phone: Some("+91 98450 12345".to_string()),
            gender: Some(Gender::Male),
            ..ProfileUpdate::default()
        };
        let changed = u.apply_profile(&update, day(2025, 6, 1)).unwrap();
        assert_eq!(changed, vec!["gender", "phone"]);
        assert_eq!(u.profile.phone, "+91 98450 12345");

        // Same values again: nothing to record.
        assert!(u.apply_profile(&update, day(2025, 6, 1)).unwrap().is_empty());
    }

    #[test]
    fn invalid_profile_edits_leave_the_user_untouched() {
        let mut u = User::new("E-3", "Asha", "assistant").unwrap();
        let before = u.clone();

        let future = ProfileUpdate {
            address: Some("Lab block B".to_string()),
            date_of_birth: Some(day(2030, 1, 1)),
            ..ProfileUpdate::default()
        };
        assert!(u.apply_profile(&future, day(2025, 6, 1)).is_err());

        let not_base64 = ProfileUpdate {
            picture: Some("<svg/>".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(u.apply_profile(&not_base64, day(2025, 6, 1)).is_err());
        assert_eq!(u, before);
    }

    #[test]
    fn empty_picture_clears_it() {
        let mut u = User::new("E-4", "Lena", "assistant").unwrap();
        let set = ProfileUpdate { picture: Some("iVBORw0KGgo=".to_string()), ..ProfileUpdate::default() };
        assert_eq!(u.apply_profile(&set, day(2025, 6, 1)).unwrap(), vec!["picture"]);

        let clear = ProfileUpdate { picture: Some(String::new()), ..ProfileUpdate::default() };
        assert_eq!(u.apply_profile(&clear, day(2025, 6, 1)).unwrap(), vec!["picture"]);
        assert!(u.profile.picture.is_none());
    }

    #[test]
    fn users_stored_without_a_profile_still_load() {
        let json = serde_json::json!({
            "id": UserId::new(),
            "employee_id": "E-9",
            "name": "Old Record",
            "role": "assistant",
            "status": "Active"
        });
        let u: User = serde_json::from_value(json).unwrap();
        assert_eq!(u.profile, UserProfile::default());
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(User::new("", "Asha", "assistant").is_err());
        assert!(User::new("E-1", " ", "assistant").is_err());
        assert!(User::new("E-1", "Asha", "").is_err());
    }
}
