//! Kit registry operations.
//!
//! Issue and return touch several items plus the kit itself. All of it goes
//! into one change set, checked against the versions the plan was computed
//! from, so a partial issue is never observable: either every component
//! moves and the circulation counter changes, or nothing does.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use labstock_auth::{CredentialStore, Identity, Permission};
use labstock_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use labstock_inventory::{InventoryCommand, InventoryItemId, Restock, StockOut, StockTransaction};
use labstock_kits::{
    DefineKit, IssueKits, Kit, KitCommand, KitComponent, KitEventRecord, KitId, ReturnKits,
    issue_note, plan_issue, plan_return, return_note,
};
use labstock_numbering::DocumentKind;

use super::{InventoryEngine, decide_item};
use crate::audit::{AuditAction, AuditEntry};
use crate::error::EngineError;
use crate::store::{ChangeSet, LedgerStore, Mutation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub components: Vec<KitComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Issue,
    Return,
}

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    /// Define a kit under a freshly allocated `kit_ref`.
    #[instrument(skip(self, actor, kit), fields(actor = %actor.employee_id, name = %kit.name))]
    pub fn define_kit(&self, actor: &Identity, kit: NewKit) -> Result<Kit, EngineError> {
        self.authorize(actor, Permission::Kits)?;

        let ids: Vec<InventoryItemId> = kit.components.iter().map(|c| c.item_id).collect();
        let kit_id = KitId::new();
        let mut lost: Option<u64> = None;

        // Re-checked on every attempt: a racing delete surfaces from the
        // store as a dangling reference and lands here again.
        let defined = self.retry.run("define_kit", |_| {
            let items = self.store.items_by_id(&ids)?;
            if let Some(missing) = ids.iter().find(|id| !items.contains_key(*id)) {
                return Err(DomainError::not_found("item", missing).into());
            }

            let now = self.now();
            let allocated = self.allocator.candidate(&self.store, DocumentKind::Kit, now, lost)?;
            lost = Some(allocated.sequence);

            let command = KitCommand::DefineKit(DefineKit {
                kit_id,
                kit_ref: allocated.number.clone(),
                name: kit.name.clone(),
                description: kit.description.clone(),
                creator: actor.user_id,
                components: kit.components.clone(),
                occurred_at: now,
            });
            let (defined, _) = Kit::empty(kit_id).decide(&command)?;

            let mut changes = ChangeSet::new();
            changes.put_kit(defined.clone(), ExpectedVersion::Absent);
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::KitDefined,
                defined.kit_ref(),
                format!("{} ({} component line(s))", defined.name(), defined.components().len()),
                now,
            ));
            self.store.commit(changes)?;
            Ok(defined)
        })?;

        info!(kit_ref = %defined.kit_ref(), "kit defined");
        Ok(defined)
    }

    /// Issue `count` kits: draw every component, all or nothing.
    #[instrument(skip(self, actor, note), fields(actor = %actor.employee_id))]
    pub fn issue_kit(
        &self,
        actor: &Identity,
        kit_id: KitId,
        count: u64,
        note: &str,
    ) -> Result<Vec<StockTransaction>, EngineError> {
        self.authorize(actor, Permission::Kits)?;
        let transactions = self.retry.run("issue_kit", |_| {
            self.circulate(actor, kit_id, count, note, Direction::Issue)
        })?;
        info!(kit_id = %kit_id, count, lines = transactions.len(), "kits issued");
        Ok(transactions)
    }

    /// Return `count` kits, putting every component back at its current
    /// cost basis.
    #[instrument(skip(self, actor, note), fields(actor = %actor.employee_id))]
    pub fn return_kit(
        &self,
        actor: &Identity,
        kit_id: KitId,
        count: u64,
        note: &str,
    ) -> Result<Vec<StockTransaction>, EngineError> {
        self.authorize(actor, Permission::Kits)?;
        let transactions = self.retry.run("return_kit", |_| {
            self.circulate(actor, kit_id, count, note, Direction::Return)
        })?;
        info!(kit_id = %kit_id, count, lines = transactions.len(), "kits returned");
        Ok(transactions)
    }

    /// One attempt at an issue or return.
    fn circulate(
        &self,
        actor: &Identity,
        kit_id: KitId,
        count: u64,
        note: &str,
        direction: Direction,
    ) -> Result<Vec<StockTransaction>, EngineError> {
        let now = self.now();
        let kit = self
            .store
            .kit(kit_id)?
            .ok_or_else(|| DomainError::not_found("kit", kit_id))?;
        let note = note.trim();

        let ids: Vec<InventoryItemId> = kit.components().iter().map(|c| c.item_id).collect();

        let (kit_command, line_note, action) = match direction {
            Direction::Issue => (
                KitCommand::IssueKits(IssueKits {
                    kit_id,
                    count,
                    actor: actor.user_id,
                    note: note.to_string(),
                    occurred_at: now,
                }),
                issue_note(count, kit.kit_ref(), note),
                AuditAction::KitIssued,
            ),
            Direction::Return => (
                KitCommand::ReturnKits(ReturnKits {
                    kit_id,
                    count,
                    actor: actor.user_id,
                    note: note.to_string(),
                    occurred_at: now,
                }),
                return_note(count, kit.kit_ref(), note),
                AuditAction::KitReturned,
            ),
        };
        // Count and circulation checks come before any balance is read.
        let (next_kit, kit_events) = kit.decide(&kit_command)?;

        // One read of every component; the commit below is checked against
        // exactly these versions.
        let items = self.store.items_by_id(&ids)?;
        let draws = match direction {
            Direction::Issue => plan_issue(&kit, count, &items)?,
            Direction::Return => plan_return(&kit, count)?,
        };

        let mut changes = ChangeSet::new();
        let mut transactions = Vec::with_capacity(draws.len());
        for draw in &draws {
            let item = items
                .get(&draw.item_id)
                .ok_or_else(|| DomainError::not_found("item", draw.item_id))?;
            let command = match direction {
                Direction::Issue => InventoryCommand::StockOut(StockOut {
                    item_id: draw.item_id,
                    quantity: draw.quantity,
                    actor: actor.user_id,
                    note: line_note.clone(),
                    occurred_at: now,
                }),
                Direction::Return => InventoryCommand::Restock(Restock {
                    item_id: draw.item_id,
                    quantity: draw.quantity,
                    actor: actor.user_id,
                    note: line_note.clone(),
                    occurred_at: now,
                }),
            };
            let (next, rows) = decide_item(item, &command, actor)?;
            changes.put_item(next, ExpectedVersion::Exact(item.version()));
            for tx in rows {
                changes.append_transaction(tx.clone());
                transactions.push(tx);
            }
        }

        changes.put_kit(next_kit, ExpectedVersion::Exact(kit.version()));
        for event in &kit_events {
            if let Some(record) = KitEventRecord::from_event(event, kit.kit_ref()) {
                changes.push(Mutation::AppendKitEvent(record));
            }
        }
        changes.audit(AuditEntry::by(
            actor,
            action,
            kit.kit_ref(),
            format!("{count} kit(s), {} component line(s)", draws.len()),
            now,
        ));
        self.store.commit(changes)?;
        Ok(transactions)
    }

    pub fn kit(&self, actor: &Identity, kit_id: KitId) -> Result<Kit, EngineError> {
        self.authorize(actor, Permission::Kits)?;
        self.store
            .kit(kit_id)?
            .ok_or_else(|| DomainError::not_found("kit", kit_id).into())
    }

    pub fn kits(&self, actor: &Identity) -> Result<Vec<Kit>, EngineError> {
        self.authorize(actor, Permission::Kits)?;
        Ok(self.store.kits()?)
    }

    pub fn kit_events(&self, actor: &Identity, kit_id: KitId) -> Result<Vec<KitEventRecord>, EngineError> {
        self.authorize(actor, Permission::Kits)?;
        if self.store.kit(kit_id)?.is_none() {
            return Err(DomainError::not_found("kit", kit_id).into());
        }
        Ok(self.store.kit_events(kit_id)?)
    }
}
