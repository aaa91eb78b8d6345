//! `labstock-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines the
//! permission vocabulary, role definitions, session expiry rules and credential
//! hashing, and leaves persistence to `labstock-infra`.

pub mod authorize;
pub mod credentials;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{AuthzError, Identity, authorize};
pub use credentials::{CredentialError, CredentialStore, hash_secret, validate_secret, verify_secret};
pub use permissions::{Permission, PermissionSet};
pub use roles::{ADMIN_ROLE, ASSISTANT_ROLE, Role};
pub use session::{Session, SessionToken};
pub use user::{Gender, ProfileUpdate, User, UserProfile, UserStatus};
