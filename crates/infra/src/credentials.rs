//! Argon2-backed credential store.

use std::collections::HashMap;
use std::sync::RwLock;

use labstock_auth::{CredentialError, CredentialStore, hash_secret, validate_secret, verify_secret};

/// Keeps one Argon2id PHC string per employee id. Clear-text secrets never
/// reach the map.
#[derive(Debug, Default)]
pub struct Argon2CredentialStore {
    hashes: RwLock<HashMap<String, String>>,
}

impl Argon2CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for Argon2CredentialStore {
    fn verify_credential(&self, employee_id: &str, secret: &str) -> Result<bool, CredentialError> {
        let hashes = self
            .hashes
            .read()
            .map_err(|_| CredentialError::Unavailable("lock poisoned".to_string()))?;
        Ok(hashes
            .get(employee_id)
            .is_some_and(|phc| verify_secret(secret, phc)))
    }

    fn set_credential(&self, employee_id: &str, secret: &str) -> Result<(), CredentialError> {
        validate_secret(secret)?;
        let phc = hash_secret(secret)?;
        self.hashes
            .write()
            .map_err(|_| CredentialError::Unavailable("lock poisoned".to_string()))?
            .insert(employee_id.to_string(), phc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_do_not_verify() {
        let store = Argon2CredentialStore::new();
        assert!(!store.verify_credential("nobody", "whatever-secret").unwrap());
    }

    #[test]
    fn set_then_verify_and_rotate() {
        let store = Argon2CredentialStore::new();
        store.set_credential("E-9", "first-secret").unwrap();
        assert!(store.verify_credential("E-9", "first-secret").unwrap());

        store.set_credential("E-9", "second-secret").unwrap();
        assert!(!store.verify_credential("E-9", "first-secret").unwrap());
        assert!(store.verify_credential("E-9", "second-secret").unwrap());
    }

    #[test]
    fn short_secrets_are_refused() {
        let store = Argon2CredentialStore::new();
        assert_eq!(store.set_credential("E-9", "123"), Err(CredentialError::TooShort));
    }
}
