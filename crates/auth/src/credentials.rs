//! Credential verification boundary.
//!
//! Secrets are never stored or compared in clear text: the store keeps an
//! Argon2id PHC string per employee id and verification goes through
//! [`verify_secret`].

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum secret length accepted by [`validate_secret`].
pub const MIN_SECRET_LENGTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("secret must be at least {MIN_SECRET_LENGTH} characters")]
    TooShort,

    #[error("failed to hash secret")]
    Hash,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Pluggable credential store keyed by employee id.
pub trait CredentialStore: Send + Sync {
    /// `Ok(false)` for an unknown id or a wrong secret; errors are reserved for
    /// store failures.
    fn verify_credential(&self, employee_id: &str, secret: &str) -> Result<bool, CredentialError>;

    /// Replace (or create) the credential for `employee_id`.
    fn set_credential(&self, employee_id: &str, secret: &str) -> Result<(), CredentialError>;
}

impl<S> CredentialStore for std::sync::Arc<S>
where
    S: CredentialStore + ?Sized,
{
    fn verify_credential(&self, employee_id: &str, secret: &str) -> Result<bool, CredentialError> {
        (**self).verify_credential(employee_id, secret)
    }

    fn set_credential(&self, employee_id: &str, secret: &str) -> Result<(), CredentialError> {
        (**self).set_credential(employee_id, secret)
    }
}

pub fn validate_secret(secret: &str) -> Result<(), CredentialError> {
    if secret.chars().count() < MIN_SECRET_LENGTH {
        return Err(CredentialError::TooShort);
    }
    Ok(())
}

/// Hash a secret using Argon2id with a fresh random salt.
pub fn hash_secret(secret: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CredentialError::Hash)
}

/// Verify a secret against a stored PHC hash. Malformed hashes never verify.
pub fn verify_secret(secret: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let phc = hash_secret("correct horse").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_secret("correct horse", &phc));
        assert!(!verify_secret("wrong horse", &phc));
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        let a = hash_secret("lab-secret").unwrap();
        let b = hash_secret("lab-secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn plain_text_is_not_a_valid_hash() {
        assert!(!verify_secret("admin123", "admin123"));
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert_eq!(validate_secret("123"), Err(CredentialError::TooShort));
        assert!(validate_secret("12345678").is_ok());
    }
}
