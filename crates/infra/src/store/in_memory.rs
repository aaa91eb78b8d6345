use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use labstock_auth::{Role, User};
use labstock_core::{AggregateRoot, ExpectedVersion, UserId};
use labstock_inventory::{Category, InventoryItem, InventoryItemId, StockTransaction};
use labstock_kits::{Kit, KitEventRecord, KitId};
use labstock_numbering::DocumentKind;
use labstock_purchasing::{PurchaseOrder, PurchaseOrderId};

use crate::audit::AuditEntry;

use super::r#trait::{ChangeSet, Constraint, LedgerStore, Mutation, Record, StoreError};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<InventoryItemId, InventoryItem>,
    transactions: Vec<StockTransaction>,
    kits: HashMap<KitId, Kit>,
    kit_refs: HashMap<String, KitId>,
    kit_events: Vec<KitEventRecord>,
    purchase_orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    po_numbers: HashMap<String, PurchaseOrderId>,
    /// Keyed by lowercase name.
    categories: BTreeMap<String, Category>,
    users: HashMap<UserId, Record<User>>,
    employee_ids: HashMap<String, UserId>,
    roles: BTreeMap<String, Record<Role>>,
    audit: Vec<AuditEntry>,
}

fn category_key(category: &Category) -> String {
    category.as_str().to_lowercase()
}

fn check_version(
    entity: &'static str,
    id: impl ToString,
    expected: ExpectedVersion,
    actual: Option<u64>,
) -> Result<(), StoreError> {
    if expected.matches(actual) {
        return Ok(());
    }
    Err(StoreError::VersionConflict {
        entity,
        id: id.to_string(),
        expected: format!("{expected:?}"),
        actual: format!("{actual:?}"),
    })
}

/// Tracks what a single change set touches so that two mutations cannot
/// target the same record or claim the same unique key.
#[derive(Default)]
struct Claims {
    records: HashSet<(&'static str, String)>,
    keys: HashSet<(Constraint, String)>,
}

impl Claims {
    fn record(&mut self, entity: &'static str, id: impl ToString) -> Result<(), StoreError> {
        let id = id.to_string();
        if !self.records.insert((entity, id.clone())) {
            return Err(StoreError::InvalidChangeSet(format!(
                "{entity} {id} is written twice"
            )));
        }
        Ok(())
    }

    fn key(&mut self, constraint: Constraint, key: &str) -> Result<(), StoreError> {
        if !self.keys.insert((constraint, key.to_string())) {
            return Err(StoreError::DuplicateKey {
                constraint,
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl Tables {
    /// Check every mutation against the current state. No writes happen here.
    fn validate(&self, mutations: &[Mutation]) -> Result<(), StoreError> {
        let mut claims = Claims::default();

        let mut removed_items = HashSet::new();
        let mut put_items = HashSet::new();
        let mut put_kits = HashMap::new();
        for mutation in mutations {
            match mutation {
                Mutation::RemoveItem { item_id, .. } => {
                    removed_items.insert(*item_id);
                }
                Mutation::PutItem { item, .. } => {
                    put_items.insert(item.id_typed());
                }
                Mutation::PutKit { kit, .. } => {
                    put_kits.insert(kit.id_typed(), kit);
                }
                _ => {}
            }
        }

        for mutation in mutations {
            match mutation {
                Mutation::PutItem { item, expected } => {
                    let id = item.id_typed();
                    claims.record("item", id)?;
                    let actual = self.items.get(&id).map(|v| v.version());
                    check_version("item", id, *expected, actual)?;
                }
                Mutation::RemoveItem { item_id, expected } => {
                    claims.record("item", item_id)?;
                    let Some(current) = self.items.get(item_id) else {
                        return Err(StoreError::MissingRecord {
                            entity: "item",
                            id: item_id.to_string(),
                        });
                    };
                    check_version("item", item_id, *expected, Some(current.version()))?;

                    // Kits as they will look after this set is applied.
                    let mut kits_after = self
                        .kits
                        .iter()
                        .filter(|(id, _)| !put_kits.contains_key(*id))
                        .map(|(_, kit)| kit)
                        .chain(put_kits.values().copied());
                    if let Some(kit) = kits_after.find(|kit| kit.references(*item_id)) {
                        return Err(StoreError::DanglingReference {
                            entity: "kit",
                            id: kit.kit_ref().to_string(),
                            target: format!("item {item_id}"),
                        });
                    }
                }
                Mutation::PutKit { kit, expected } => {
                    let id = kit.id_typed();
                    claims.record("kit", id)?;
                    let stored = self.kits.get(&id);
                    check_version("kit", id, *expected, stored.map(|v| v.version()))?;
                    match stored {
                        None => {
                            claims.key(Constraint::KitRef, kit.kit_ref())?;
                            if self.kit_refs.contains_key(kit.kit_ref()) {
                                return Err(StoreError::DuplicateKey {
                                    constraint: Constraint::KitRef,
                                    key: kit.kit_ref().to_string(),
                                });
                            }
                        }
                        Some(existing) if existing.kit_ref() != kit.kit_ref() => {
                            return Err(StoreError::InvalidChangeSet(format!(
                                "kit_ref of kit {id} cannot change"
                            )));
                        }
                        Some(_) => {}
                    }

                    for line in kit.components() {
                        let present = !removed_items.contains(&line.item_id)
                            && (self.items.contains_key(&line.item_id)
                                || put_items.contains(&line.item_id));
                        if !present {
                            return Err(StoreError::DanglingReference {
                                entity: "kit",
                                id: kit.kit_ref().to_string(),
                                target: format!("item {}", line.item_id),
                            });
                        }
                    }
                }
                Mutation::InsertPurchaseOrder(order) => {
                    claims.record("purchase_order", order.id)?;
                    if self.purchase_orders.contains_key(&order.id) {
                        return Err(StoreError::InvalidChangeSet(format!(
                            "purchase order {} already exists",
                            order.id
                        )));
                    }
                    claims.key(Constraint::PoNumber, &order.po_number)?;
                    if self.po_numbers.contains_key(&order.po_number) {
                        return Err(StoreError::DuplicateKey {
                            constraint: Constraint::PoNumber,
                            key: order.po_number.clone(),
                        });
                    }
                }
                Mutation::RemovePurchaseOrder(id) => {
                    claims.record("purchase_order", id)?;
                    if !self.purchase_orders.contains_key(id) {
                        return Err(StoreError::MissingRecord {
                            entity: "purchase_order",
                            id: id.to_string(),
                        });
                    }
                }
                Mutation::InsertCategory(category) => {
                    let key = category_key(category);
                    claims.key(Constraint::Category, &key)?;
                    if self.categories.contains_key(&key) {
                        return Err(StoreError::DuplicateKey {
                            constraint: Constraint::Category,
                            key: category.as_str().to_string(),
                        });
                    }
                }
                Mutation::PutUser { user, expected } => {
                    claims.record("user", user.id)?;
                    let stored = self.users.get(&user.id);
                    check_version("user", user.id, *expected, stored.map(|r| r.revision))?;

                    let changed = stored.is_none_or(|r| r.value.employee_id != user.employee_id);
                    if changed {
                        claims.key(Constraint::EmployeeId, &user.employee_id)?;
                        if self.employee_ids.contains_key(&user.employee_id) {
                            return Err(StoreError::DuplicateKey {
                                constraint: Constraint::EmployeeId,
                                key: user.employee_id.clone(),
                            });
                        }
                    }
                }
                Mutation::RemoveUser { user_id, expected } => {
                    claims.record("user", user_id)?;
                    let Some(stored) = self.users.get(user_id) else {
                        return Err(StoreError::MissingRecord {
                            entity: "user",
                            id: user_id.to_string(),
                        });
                    };
                    check_version("user", user_id, *expected, Some(stored.revision))?;
                }
                Mutation::PutRole { role, expected } => {
                    claims.record("role", role.name())?;
                    let actual = self.roles.get(role.name()).map(|r| r.revision);
                    if *expected == ExpectedVersion::Absent && actual.is_some() {
                        return Err(StoreError::DuplicateKey {
                            constraint: Constraint::RoleName,
                            key: role.name().to_string(),
                        });
                    }
                    check_version("role", role.name(), *expected, actual)?;
                }
                Mutation::AppendTransaction(_)
                | Mutation::AppendKitEvent(_)
                | Mutation::AppendAudit(_) => {}
            }
        }

        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutItem { item, .. } => {
                self.items.insert(item.id_typed(), item);
            }
            Mutation::RemoveItem { item_id, .. } => {
                self.items.remove(&item_id);
            }
            Mutation::PutKit { kit, .. } => {
                let id = kit.id_typed();
                self.kit_refs.insert(kit.kit_ref().to_string(), id);
                self.kits.insert(id, kit);
            }
            Mutation::InsertPurchaseOrder(order) => {
                self.po_numbers.insert(order.po_number.clone(), order.id);
                self.purchase_orders.insert(order.id, order);
            }
            // The number stays in `po_numbers`: it is never handed out again.
            Mutation::RemovePurchaseOrder(id) => {
                self.purchase_orders.remove(&id);
            }
            Mutation::InsertCategory(category) => {
                self.categories.insert(category_key(&category), category);
            }
            Mutation::PutUser { user, .. } => {
                let revision = match self.users.get(&user.id) {
                    Some(previous) => {
                        if previous.value.employee_id != user.employee_id {
                            self.employee_ids.remove(&previous.value.employee_id);
                        }
                        previous.revision + 1
                    }
                    None => 1,
                };
                self.employee_ids.insert(user.employee_id.clone(), user.id);
                self.users.insert(user.id, Record { revision, value: user });
            }
            Mutation::RemoveUser { user_id, .. } => {
                if let Some(removed) = self.users.remove(&user_id) {
                    self.employee_ids.remove(&removed.value.employee_id);
                }
            }
            Mutation::PutRole { role, .. } => {
                let revision = self.roles.get(role.name()).map_or(1, |r| r.revision + 1);
                self.roles
                    .insert(role.name().to_string(), Record { revision, value: role });
            }
            Mutation::AppendTransaction(tx) => self.transactions.push(tx),
            Mutation::AppendKitEvent(event) => self.kit_events.push(event),
            Mutation::AppendAudit(entry) => self.audit.push(entry),
        }
    }
}

/// In-memory ledger store.
///
/// A single `RwLock` over all tables: commits take the write lock for the
/// whole validate-then-apply step, so change sets are serializable.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.write()?;
        tables.validate(changes.mutations())?;
        for mutation in changes.into_mutations() {
            tables.apply(mutation);
        }
        Ok(())
    }

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let mut items: Vec<_> = self.read()?.items.values().cloned().collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(items)
    }

    fn items_by_id(
        &self,
        ids: &[InventoryItemId],
    ) -> Result<BTreeMap<InventoryItemId, InventoryItem>, StoreError> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.items.get(id).map(|item| (*id, item.clone())))
            .collect())
    }

    fn transactions(&self) -> Result<Vec<StockTransaction>, StoreError> {
        Ok(self.read()?.transactions.clone())
    }

    fn kit(&self, id: KitId) -> Result<Option<Kit>, StoreError> {
        Ok(self.read()?.kits.get(&id).cloned())
    }

    fn kits(&self) -> Result<Vec<Kit>, StoreError> {
        let mut kits: Vec<_> = self.read()?.kits.values().cloned().collect();
        kits.sort_by(|a, b| a.kit_ref().cmp(b.kit_ref()));
        Ok(kits)
    }

    fn kits_referencing(&self, item_id: InventoryItemId) -> Result<Vec<Kit>, StoreError> {
        Ok(self
            .read()?
            .kits
            .values()
            .filter(|kit| kit.references(item_id))
            .cloned()
            .collect())
    }

    fn kit_events(&self, kit_id: KitId) -> Result<Vec<KitEventRecord>, StoreError> {
        Ok(self
            .read()?
            .kit_events
            .iter()
            .filter(|e| e.kit_id == kit_id)
            .cloned()
            .collect())
    }

    fn purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        Ok(self.read()?.purchase_orders.get(&id).cloned())
    }

    fn purchase_orders(&self) -> Result<Vec<PurchaseOrder>, StoreError> {
        let mut orders: Vec<_> = self.read()?.purchase_orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    fn issued_numbers(&self, kind: DocumentKind) -> Result<Vec<String>, StoreError> {
        let tables = self.read()?;
        let numbers = match kind {
            DocumentKind::PurchaseOrder => tables.po_numbers.keys().cloned().collect(),
            DocumentKind::Kit => tables.kit_refs.keys().cloned().collect(),
        };
        Ok(numbers)
    }

    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    fn user(&self, id: UserId) -> Result<Option<Record<User>>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn user_by_employee_id(&self, employee_id: &str) -> Result<Option<Record<User>>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .employee_ids
            .get(employee_id)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<_> = self
            .read()?
            .users
            .values()
            .map(|r| r.value.clone())
            .collect();
        users.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(users)
    }

    fn role(&self, name: &str) -> Result<Option<Record<Role>>, StoreError> {
        Ok(self.read()?.roles.get(name).cloned())
    }

    fn roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self
            .read()?
            .roles
            .values()
            .map(|r| r.value.clone())
            .collect())
    }

    fn audit_log(&self) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self.read()?.audit.clone())
    }
}
