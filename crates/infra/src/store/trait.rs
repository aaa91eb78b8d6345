use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use labstock_auth::{Role, User};
use labstock_core::{ExpectedVersion, UserId};
use labstock_inventory::{Category, InventoryItem, InventoryItemId, StockTransaction};
use labstock_kits::{Kit, KitEventRecord, KitId};
use labstock_numbering::DocumentKind;
use labstock_purchasing::{PurchaseOrder, PurchaseOrderId};

use crate::audit::AuditEntry;

/// Uniqueness constraints enforced at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    PoNumber,
    KitRef,
    EmployeeId,
    Category,
    RoleName,
}

impl Constraint {
    /// Keys produced by the numbering allocator; a collision means another
    /// caller won the race and a fresh number should be drawn.
    pub fn is_generated(&self) -> bool {
        matches!(self, Constraint::PoNumber | Constraint::KitRef)
    }
}

impl core::fmt::Display for Constraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Constraint::PoNumber => "po_number",
            Constraint::KitRef => "kit_ref",
            Constraint::EmployeeId => "employee_id",
            Constraint::Category => "category",
            Constraint::RoleName => "role",
        };
        f.write_str(label)
    }
}

/// Store operation error.
///
/// These are persistence-level outcomes; the engine maps them into
/// `EngineError` (and decides which ones to retry).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("version conflict on {entity} {id} (expected {expected}, found {actual})")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("duplicate {constraint}: {key}")]
    DuplicateKey { constraint: Constraint, key: String },

    #[error("{entity} not found: {id}")]
    MissingRecord { entity: &'static str, id: String },

    /// A write would leave a kit line pointing at an item that is gone.
    #[error("{entity} {id} references missing {target}")]
    DanglingReference {
        entity: &'static str,
        id: String,
        target: String,
    },

    #[error("invalid change set: {0}")]
    InvalidChangeSet(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// A value with a store-assigned revision (for records that are not
/// aggregates and so carry no version of their own).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    pub revision: u64,
    pub value: T,
}

/// One write inside a [`ChangeSet`].
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert (`Absent`) or replace (`Exact(v)`, checked against the stored
    /// aggregate version) an item.
    PutItem {
        item: InventoryItem,
        expected: ExpectedVersion,
    },
    RemoveItem {
        item_id: InventoryItemId,
        expected: ExpectedVersion,
    },
    /// Inserting a kit also claims its `kit_ref`.
    PutKit { kit: Kit, expected: ExpectedVersion },
    /// Inserting an order also claims its `po_number`.
    InsertPurchaseOrder(PurchaseOrder),
    RemovePurchaseOrder(PurchaseOrderId),
    InsertCategory(Category),
    /// Revision-checked user write; a changed `employee_id` is re-claimed.
    PutUser { user: User, expected: ExpectedVersion },
    /// Drops the user and releases its `employee_id`.
    RemoveUser {
        user_id: UserId,
        expected: ExpectedVersion,
    },
    PutRole { role: Role, expected: ExpectedVersion },
    AppendTransaction(StockTransaction),
    AppendKitEvent(KitEventRecord),
    AppendAudit(AuditEntry),
}

/// An all-or-nothing batch of writes.
///
/// The store validates every expectation and constraint in the set before
/// applying any of it.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn put_item(&mut self, item: InventoryItem, expected: ExpectedVersion) -> &mut Self {
        self.push(Mutation::PutItem { item, expected })
    }

    pub fn put_kit(&mut self, kit: Kit, expected: ExpectedVersion) -> &mut Self {
        self.push(Mutation::PutKit { kit, expected })
    }

    pub fn append_transaction(&mut self, tx: StockTransaction) -> &mut Self {
        self.push(Mutation::AppendTransaction(tx))
    }

    pub fn audit(&mut self, entry: AuditEntry) -> &mut Self {
        self.push(Mutation::AppendAudit(entry))
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }
}

/// Durable state of the ledger: items, transactions, kits (with their BOM
/// lines), kit events, purchase orders, categories, users, roles, audit.
///
/// ## Commit semantics
///
/// `commit()` is the only write path. It must:
/// - check every `ExpectedVersion` against current state
/// - check every uniqueness constraint (`po_number`, `kit_ref`,
///   `employee_id`, category and role names)
/// - refuse item removals that a kit still references, and kit writes
///   whose lines name an item that is missing or removed in the same set
/// - apply all mutations or none
///
/// Implementations serialize commits; readers never observe a partially
/// applied change set.
pub trait LedgerStore: Send + Sync {
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;
    fn items(&self) -> Result<Vec<InventoryItem>, StoreError>;
    /// Items keyed by id; unknown ids are simply absent from the map.
    fn items_by_id(
        &self,
        ids: &[InventoryItemId],
    ) -> Result<BTreeMap<InventoryItemId, InventoryItem>, StoreError>;
    fn transactions(&self) -> Result<Vec<StockTransaction>, StoreError>;

    fn kit(&self, id: KitId) -> Result<Option<Kit>, StoreError>;
    fn kits(&self) -> Result<Vec<Kit>, StoreError>;
    fn kits_referencing(&self, item_id: InventoryItemId) -> Result<Vec<Kit>, StoreError>;
    fn kit_events(&self, kit_id: KitId) -> Result<Vec<KitEventRecord>, StoreError>;

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError>;
    fn purchase_orders(&self) -> Result<Vec<PurchaseOrder>, StoreError>;

    /// Every number of `kind` claimed so far. Numbers of deleted documents
    /// stay claimed and are still listed.
    fn issued_numbers(&self, kind: DocumentKind) -> Result<Vec<String>, StoreError>;

    fn categories(&self) -> Result<Vec<Category>, StoreError>;

    fn user(&self, id: UserId) -> Result<Option<Record<User>>, StoreError>;
    fn user_by_employee_id(&self, employee_id: &str) -> Result<Option<Record<User>>, StoreError>;
    fn users(&self) -> Result<Vec<User>, StoreError>;

    fn role(&self, name: &str) -> Result<Option<Record<Role>>, StoreError>;
    fn roles(&self) -> Result<Vec<Role>, StoreError>;

    fn audit_log(&self) -> Result<Vec<AuditEntry>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).commit(changes)
    }

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).item(id)
    }

    fn items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).items()
    }

    fn items_by_id(
        &self,
        ids: &[InventoryItemId],
    ) -> Result<BTreeMap<InventoryItemId, InventoryItem>, StoreError> {
        (**self).items_by_id(ids)
    }

    fn transactions(&self) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).transactions()
    }

    fn kit(&self, id: KitId) -> Result<Option<Kit>, StoreError> {
        (**self).kit(id)
    }

    fn kits(&self) -> Result<Vec<Kit>, StoreError> {
        (**self).kits()
    }

    fn kits_referencing(&self, item_id: InventoryItemId) -> Result<Vec<Kit>, StoreError> {
        (**self).kits_referencing(item_id)
    }

    fn kit_events(&self, kit_id: KitId) -> Result<Vec<KitEventRecord>, StoreError> {
        (**self).kit_events(kit_id)
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        (**self).purchase_order(id)
    }

    fn purchase_orders(&self) -> Result<Vec<PurchaseOrder>, StoreError> {
        (**self).purchase_orders()
    }

    fn issued_numbers(&self, kind: DocumentKind) -> Result<Vec<String>, StoreError> {
        (**self).issued_numbers(kind)
    }

    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).categories()
    }

    fn user(&self, id: UserId) -> Result<Option<Record<User>>, StoreError> {
        (**self).user(id)
    }

    fn user_by_employee_id(&self, employee_id: &str) -> Result<Option<Record<User>>, StoreError> {
        (**self).user_by_employee_id(employee_id)
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        (**self).users()
    }

    fn role(&self, name: &str) -> Result<Option<Record<Role>>, StoreError> {
        (**self).role(name)
    }

    fn roles(&self) -> Result<Vec<Role>, StoreError> {
        (**self).roles()
    }

    fn audit_log(&self) -> Result<Vec<AuditEntry>, StoreError> {
        (**self).audit_log()
    }
}
