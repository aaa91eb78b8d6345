use serde::{Deserialize, Serialize};
use thiserror::Error;

use labstock_core::{DomainError, UserId};

use crate::{Permission, Role};

/// A resolved, authenticated actor.
///
/// Produced by session validation and carried into every mutating call, where
/// it is used both for the permission check and for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub employee_id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role mismatch: identity holds '{held}', policy is for '{checked}'")]
    RoleMismatch { held: String, checked: String },

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(p) => DomainError::permission_denied(p.label()),
            other => DomainError::permission_denied(other.to_string()),
        }
    }
}

/// Authorize an identity against its role definition.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(identity: &Identity, role: &Role, required: Permission) -> Result<(), AuthzError> {
    if identity.role != role.name() {
        return Err(AuthzError::RoleMismatch {
            held: identity.role.clone(),
            checked: role.name().to_string(),
        });
    }

    if role.permits(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}
