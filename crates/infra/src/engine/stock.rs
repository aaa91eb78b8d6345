//! Stock ledger operations: item lifecycle, categories, stock-in/out.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use labstock_auth::{CredentialStore, Identity, Permission};
use labstock_core::{Aggregate, AggregateRoot, ExpectedVersion, Money};
use labstock_inventory::{
    Category, DefineItem, InventoryCommand, InventoryItem, InventoryItemId, StockIn, StockOut,
    StockTransaction,
};
use labstock_kits::{DropComponent, KitCommand};

use super::{InventoryEngine, decide_item};
use crate::audit::{AuditAction, AuditEntry};
use crate::error::EngineError;
use crate::store::{ChangeSet, LedgerStore, Mutation};

pub const OPENING_BALANCE_NOTE: &str = "Opening balance";

/// Input for a new item (manual entry or one import row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub location: String,
    /// Defaults to [`InventoryItem::DEFAULT_MIN_STOCK`].
    #[serde(default)]
    pub min_stock: Option<u64>,
    #[serde(default)]
    pub unit_cost: Money,
    #[serde(default)]
    pub opening_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Zero-based row index in the submitted batch.
    pub row: usize,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: Vec<InventoryItemId>,
    pub failures: Vec<ImportFailure>,
}

fn resolve_category(categories: &[Category], name: &str) -> Result<Category, EngineError> {
    let wanted = name.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.as_str().to_lowercase() == wanted)
        .cloned()
        .ok_or_else(|| EngineError::NotFound {
            entity: "category",
            id: name.trim().to_string(),
        })
}

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    #[instrument(skip(self, actor, item), fields(actor = %actor.employee_id, name = %item.name))]
    pub fn define_item(&self, actor: &Identity, item: NewItem) -> Result<InventoryItem, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        let categories = self.store.categories()?;
        let defined = self.commit_new_item(actor, &item, &categories)?;
        info!(item_id = %defined.id_typed(), quantity = defined.quantity(), "item defined");
        Ok(defined)
    }

    /// Define every row independently; a bad row is reported, not fatal.
    #[instrument(skip(self, actor, rows), fields(actor = %actor.employee_id, rows = rows.len()))]
    pub fn import_items(&self, actor: &Identity, rows: Vec<NewItem>) -> Result<ImportReport, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        let categories = self.store.categories()?;

        let mut report = ImportReport::default();
        for (row, item) in rows.iter().enumerate() {
            match self.commit_new_item(actor, item, &categories) {
                Ok(defined) => report.imported.push(defined.id_typed()),
                Err(err) => {
                    warn!(row, error = %err, "import row rejected");
                    report.failures.push(ImportFailure {
                        row,
                        name: item.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let mut changes = ChangeSet::new();
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::ItemsImported,
            "inventory",
            format!(
                "{} imported, {} rejected",
                report.imported.len(),
                report.failures.len()
            ),
            self.now(),
        ));
        self.store.commit(changes)?;

        info!(
            imported = report.imported.len(),
            rejected = report.failures.len(),
            "import finished"
        );
        Ok(report)
    }

    fn commit_new_item(
        &self,
        actor: &Identity,
        new: &NewItem,
        categories: &[Category],
    ) -> Result<InventoryItem, EngineError> {
        let now = self.now();
        let category = resolve_category(categories, &new.category)?;
        let item_id = InventoryItemId::new();

        let define = InventoryCommand::DefineItem(DefineItem {
            item_id,
            name: new.name.clone(),
            category: category.as_str().to_string(),
            location: new.location.clone(),
            min_stock: new.min_stock.unwrap_or(InventoryItem::DEFAULT_MIN_STOCK),
            unit_cost: new.unit_cost,
            occurred_at: now,
        });
        let (mut item, _) = InventoryItem::empty(item_id).decide(&define)?;

        let mut changes = ChangeSet::new();
        if new.opening_quantity > 0 {
            let opening = InventoryCommand::StockIn(StockIn {
                item_id,
                quantity: new.opening_quantity,
                unit_cost: new.unit_cost,
                actor: actor.user_id,
                note: OPENING_BALANCE_NOTE.to_string(),
                occurred_at: now,
            });
            let (next, transactions) = decide_item(&item, &opening, actor)?;
            item = next;
            for tx in transactions {
                changes.append_transaction(tx);
            }
        }

        changes.put_item(item.clone(), ExpectedVersion::Absent);
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::ItemDefined,
            item_id.to_string(),
            format!(
                "{} ({}), opening quantity {}",
                item.name(),
                item.category(),
                item.quantity()
            ),
            now,
        ));
        self.store.commit(changes)?;
        Ok(item)
    }

    /// Remove an item and cascade its BOM lines out of every kit.
    ///
    /// Refused while any kit that uses the item has units in circulation;
    /// returning those kits would need the item back. Ledger rows for the
    /// item are kept.
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub fn delete_item(&self, actor: &Identity, item_id: InventoryItemId) -> Result<(), EngineError> {
        self.authorize(actor, Permission::Inventory)?;

        self.retry.run("delete_item", |_| {
            let now = self.now();
            let item = self.load_item(item_id)?;
            let kits = self.store.kits_referencing(item_id)?;

            if let Some(kit) = kits.iter().find(|k| k.in_circulation() > 0) {
                return Err(EngineError::InvalidArgument(format!(
                    "item {} is used by kit {} with {} in circulation",
                    item.name(),
                    kit.kit_ref(),
                    kit.in_circulation()
                )));
            }

            let mut changes = ChangeSet::new();
            changes.push(Mutation::RemoveItem {
                item_id,
                expected: ExpectedVersion::Exact(item.version()),
            });
            for kit in &kits {
                let drop = KitCommand::DropComponent(DropComponent {
                    kit_id: kit.id_typed(),
                    item_id,
                    occurred_at: now,
                });
                let (next, _) = kit.decide(&drop)?;
                changes.put_kit(next, ExpectedVersion::Exact(kit.version()));
            }
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::ItemDeleted,
                item_id.to_string(),
                format!("{} (removed from {} kit(s))", item.name(), kits.len()),
                now,
            ));
            self.store.commit(changes)?;

            info!(item_id = %item_id, kits = kits.len(), "item deleted");
            Ok(())
        })
    }

    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub fn add_category(&self, actor: &Identity, name: &str) -> Result<Category, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        let category = Category::new(name)?;

        let mut changes = ChangeSet::new();
        changes.push(Mutation::InsertCategory(category.clone()));
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::CategoryAdded,
            category.as_str(),
            "",
            self.now(),
        ));
        self.store.commit(changes)?;
        Ok(category)
    }

    pub fn categories(&self, actor: &Identity) -> Result<Vec<Category>, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        Ok(self.store.categories()?)
    }

    pub fn item(&self, actor: &Identity, item_id: InventoryItemId) -> Result<InventoryItem, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        self.load_item(item_id)
    }

    pub fn items(&self, actor: &Identity) -> Result<Vec<InventoryItem>, EngineError> {
        self.authorize(actor, Permission::Inventory)?;
        Ok(self.store.items()?)
    }

    /// Receive a batch, re-averaging the unit cost.
    #[instrument(skip(self, actor, note), fields(actor = %actor.employee_id))]
    pub fn stock_in(
        &self,
        actor: &Identity,
        item_id: InventoryItemId,
        quantity: u64,
        unit_cost: Money,
        note: &str,
    ) -> Result<StockTransaction, EngineError> {
        self.authorize(actor, Permission::StockOperations)?;

        let tx = self.retry.run("stock_in", |_| {
            let now = self.now();
            let item = self.load_item(item_id)?;
            let command = InventoryCommand::StockIn(StockIn {
                item_id,
                quantity,
                unit_cost,
                actor: actor.user_id,
                note: note.trim().to_string(),
                occurred_at: now,
            });
            self.commit_movement(actor, &item, &command, AuditAction::StockIn, now)
        })?;

        info!(item_id = %item_id, quantity, "stock received");
        Ok(tx)
    }

    /// Issue stock. Never clamps: a request above the balance is rejected.
    #[instrument(skip(self, actor, note), fields(actor = %actor.employee_id))]
    pub fn stock_out(
        &self,
        actor: &Identity,
        item_id: InventoryItemId,
        quantity: u64,
        note: &str,
    ) -> Result<StockTransaction, EngineError> {
        self.authorize(actor, Permission::StockOperations)?;

        let tx = self.retry.run("stock_out", |_| {
            let now = self.now();
            let item = self.load_item(item_id)?;
            let command = InventoryCommand::StockOut(StockOut {
                item_id,
                quantity,
                actor: actor.user_id,
                note: note.trim().to_string(),
                occurred_at: now,
            });
            self.commit_movement(actor, &item, &command, AuditAction::StockOut, now)
        })?;

        info!(item_id = %item_id, quantity, "stock issued");
        Ok(tx)
    }

    fn commit_movement(
        &self,
        actor: &Identity,
        item: &InventoryItem,
        command: &InventoryCommand,
        action: AuditAction,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<StockTransaction, EngineError> {
        let (next, transactions) = decide_item(item, command, actor)?;
        let tx = transactions.into_iter().next().ok_or_else(|| {
            EngineError::InvariantViolation("stock movement produced no ledger row".to_string())
        })?;

        let mut changes = ChangeSet::new();
        changes.put_item(next.clone(), ExpectedVersion::Exact(item.version()));
        changes.append_transaction(tx.clone());
        changes.audit(AuditEntry::by(
            actor,
            action,
            item.id_typed().to_string(),
            format!(
                "{} x{} ({} -> {})",
                item.name(),
                tx.quantity,
                item.quantity(),
                next.quantity()
            ),
            now,
        ));
        self.store.commit(changes)?;
        Ok(tx)
    }
}
