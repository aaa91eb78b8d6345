//! First-run bootstrap: default categories, the two built-in roles and an
//! administrator account.
//!
//! Safe to run on every start; anything that already exists is left alone.

use tracing::info;

use labstock_auth::{ADMIN_ROLE, CredentialStore, Role, User, validate_secret};
use labstock_core::ExpectedVersion;
use labstock_inventory::Category;

use crate::error::EngineError;
use crate::store::{ChangeSet, LedgerStore, Mutation};

pub const ADMIN_EMPLOYEE_ID: &str = "admin";
pub const ADMIN_NAME: &str = "System Admin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub roles: usize,
    pub admin_created: bool,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        self.categories == 0 && self.roles == 0 && !self.admin_created
    }
}

pub fn bootstrap<S, C>(
    store: &S,
    credentials: &C,
    admin_secret: &str,
) -> Result<SeedReport, EngineError>
where
    S: LedgerStore + ?Sized,
    C: CredentialStore + ?Sized,
{
    validate_secret(admin_secret)?;

    let mut report = SeedReport::default();
    let mut changes = ChangeSet::new();

    let existing: Vec<String> = store
        .categories()?
        .iter()
        .map(|c| c.as_str().to_lowercase())
        .collect();
    for category in Category::defaults() {
        if !existing.contains(&category.as_str().to_lowercase()) {
            changes.push(Mutation::InsertCategory(category));
            report.categories += 1;
        }
    }

    for role in Role::defaults() {
        if store.role(role.name())?.is_none() {
            changes.push(Mutation::PutRole {
                role,
                expected: ExpectedVersion::Absent,
            });
            report.roles += 1;
        }
    }

    let admin = match store.user_by_employee_id(ADMIN_EMPLOYEE_ID)? {
        Some(_) => None,
        None => {
            let user = User::new(ADMIN_EMPLOYEE_ID, ADMIN_NAME, ADMIN_ROLE)?;
            changes.push(Mutation::PutUser {
                user: user.clone(),
                expected: ExpectedVersion::Absent,
            });
            Some(user)
        }
    };

    store.commit(changes)?;

    if let Some(user) = admin {
        credentials.set_credential(&user.employee_id, admin_secret)?;
        report.admin_created = true;
    }

    if !report.is_noop() {
        info!(
            categories = report.categories,
            roles = report.roles,
            admin_created = report.admin_created,
            "ledger bootstrapped"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Argon2CredentialStore;
    use crate::store::InMemoryLedgerStore;

    #[test]
    fn seeding_is_idempotent() {
        let store = InMemoryLedgerStore::new();
        let credentials = Argon2CredentialStore::new();

        let first = bootstrap(&store, &credentials, "bootstrap-secret").unwrap();
        assert_eq!(first.categories, 6);
        assert_eq!(first.roles, 2);
        assert!(first.admin_created);
        assert!(credentials
            .verify_credential(ADMIN_EMPLOYEE_ID, "bootstrap-secret")
            .unwrap());

        let second = bootstrap(&store, &credentials, "bootstrap-secret").unwrap();
        assert!(second.is_noop());
        assert_eq!(store.users().unwrap().len(), 1);
    }

    #[test]
    fn short_bootstrap_secret_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let credentials = Argon2CredentialStore::new();
        assert!(bootstrap(&store, &credentials, "short").is_err());
        assert!(store.users().unwrap().is_empty());
    }
}
