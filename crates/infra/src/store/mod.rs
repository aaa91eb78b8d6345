//! Ledger persistence boundary.
//!
//! One trait for every durable collection, and a single atomic write path
//! (`ChangeSet`) so that balances, circulation counters, history rows and audit
//! entries always land together.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{ChangeSet, Constraint, LedgerStore, Mutation, Record, StoreError};
