//! Ledger orchestration.
//!
//! `InventoryEngine` is the single entry point for every ledger, kit,
//! procurement and administrative call. Each mutating call follows the same
//! pipeline:
//!
//! ```text
//! Identity
//!   ↓
//! 1. authorize (role lookup, permission check; denial leaves no trace)
//!   ↓
//! 2. load current state (items, kit, counters)
//!   ↓
//! 3. decide (pure aggregate logic on a copy)
//!   ↓
//! 4. commit one ChangeSet: new state at ExpectedVersion::Exact(read version),
//!    ledger rows, audit entry
//!   ↓
//! 5. on a version or generated-key conflict, go back to 2 (bounded)
//! ```
//!
//! The engine holds no locks of its own. Atomicity comes from the store's
//! all-or-nothing commit; isolation from the version checks in it.

mod access;
mod kits;
mod procurement;
mod queries;
mod stock;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use labstock_auth::{CredentialStore, Identity};
use labstock_core::{Aggregate, DomainError};
use labstock_inventory::{InventoryCommand, InventoryItem, InventoryItemId, StockTransaction};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::numbering::DocumentNumberAllocator;
use crate::retry::RetryPolicy;
use crate::seed::{self, SeedReport};
use crate::sessions::SessionStore;
use crate::store::LedgerStore;

pub use stock::{ImportFailure, ImportReport, NewItem, OPENING_BALANCE_NOTE};
pub use kits::NewKit;
pub use procurement::RequestParams;

pub struct InventoryEngine<S, C> {
    store: S,
    credentials: C,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    allocator: DocumentNumberAllocator,
    retry: RetryPolicy,
    session_ttl: Duration,
}

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    pub fn new(store: S, credentials: C, config: &EngineConfig) -> Self {
        Self {
            store,
            credentials,
            sessions: SessionStore::new(),
            clock: Arc::new(SystemClock),
            allocator: DocumentNumberAllocator::new(config.numbering.clone()),
            retry: config.retry.clone(),
            session_ttl: config.session_ttl,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Seed categories, roles and the administrator (idempotent).
    pub fn bootstrap(&self, admin_secret: &str) -> Result<SeedReport, EngineError> {
        seed::bootstrap(&self.store, &self.credentials, admin_secret)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn load_item(&self, item_id: InventoryItemId) -> Result<InventoryItem, EngineError> {
        self.store
            .item(item_id)?
            .ok_or_else(|| DomainError::not_found("item", item_id).into())
    }
}

/// Run `command` against `item` and turn the resulting events into ledger
/// rows attributed to `actor`.
fn decide_item(
    item: &InventoryItem,
    command: &InventoryCommand,
    actor: &Identity,
) -> Result<(InventoryItem, Vec<StockTransaction>), EngineError> {
    let (next, events) = item.decide(command)?;
    let transactions = events
        .iter()
        .filter_map(|event| StockTransaction::from_event(event, next.name(), &actor.name))
        .collect();
    Ok((next, transactions))
}
