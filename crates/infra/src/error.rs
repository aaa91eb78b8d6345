//! Engine-level error model.
//!
//! Everything the engine can report to a caller funnels into [`EngineError`].
//! Domain and store failures are mapped here once, so call sites just use `?`.

use thiserror::Error;

use labstock_auth::{AuthzError, CredentialError};
use labstock_core::{DomainError, StockShortfall};

use crate::store::{Constraint, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient stock: {}", format_shortfalls(.0))]
    InsufficientStock(Vec<StockShortfall>),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not authenticated")]
    Unauthenticated,

    /// Contention outlived the retry budget.
    #[error("concurrent update: {0}")]
    ConcurrentUpdate(String),

    #[error("duplicate {constraint}: {key}")]
    DuplicateIdentifier { constraint: Constraint, key: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("store failure: {0}")]
    Store(String),
}

fn format_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl EngineError {
    /// Errors the engine retries locally before surfacing.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::ConcurrentUpdate(_) => true,
            EngineError::DuplicateIdentifier { constraint, .. } => constraint.is_generated(),
            _ => false,
        }
    }

    /// Stable machine-readable code (used by the HTTP layer and audit details).
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::InsufficientStock(_) => "insufficient_stock",
            EngineError::PermissionDenied(_) => "permission_denied",
            EngineError::Unauthenticated => "unauthenticated",
            EngineError::ConcurrentUpdate(_) => "concurrent_update",
            EngineError::DuplicateIdentifier { .. } => "duplicate_identifier",
            EngineError::InvariantViolation(_) => "invariant_violation",
            EngineError::Store(_) => "store_failure",
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidArgument(msg) => EngineError::InvalidArgument(msg),
            DomainError::InvalidId(msg) => EngineError::InvalidArgument(msg),
            DomainError::InvariantViolation(msg) => EngineError::InvariantViolation(msg),
            DomainError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DomainError::InsufficientStock(shortfalls) => EngineError::InsufficientStock(shortfalls),
            DomainError::Conflict(msg) => EngineError::ConcurrentUpdate(msg),
            DomainError::PermissionDenied(op) => EngineError::PermissionDenied(op),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict { .. } | StoreError::DanglingReference { .. } => {
                EngineError::ConcurrentUpdate(value.to_string())
            }
            StoreError::DuplicateKey { constraint, key } => {
                EngineError::DuplicateIdentifier { constraint, key }
            }
            StoreError::MissingRecord { entity, id } => EngineError::NotFound { entity, id },
            StoreError::InvalidChangeSet(msg) => EngineError::InvariantViolation(msg),
            StoreError::Poisoned => EngineError::Store(value.to_string()),
        }
    }
}

impl From<AuthzError> for EngineError {
    fn from(value: AuthzError) -> Self {
        DomainError::from(value).into()
    }
}

impl From<CredentialError> for EngineError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::TooShort => EngineError::InvalidArgument(value.to_string()),
            CredentialError::Hash | CredentialError::Unavailable(_) => {
                EngineError::Store(value.to_string())
            }
        }
    }
}
