//! Infrastructure layer: ledger store, sessions, credentials, numbering
//! allocation, configuration and the `InventoryEngine` that ties them
//! together.

pub mod audit;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod numbering;
pub mod retry;
pub mod seed;
pub mod sessions;
pub mod store;

pub use audit::{AuditAction, AuditEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use credentials::Argon2CredentialStore;
pub use engine::{ImportFailure, ImportReport, InventoryEngine, NewItem, NewKit, RequestParams};
pub use error::EngineError;
pub use retry::RetryPolicy;
pub use store::{InMemoryLedgerStore, LedgerStore};
