//! Read-only views: dashboard, ledger history, reports, audit trail.

use labstock_auth::{CredentialStore, Identity, Permission};
use labstock_inventory::{
    ActorActivity, InventorySummary, MonthlyActivity, StockTransaction, actor_history,
    monthly_breakdown,
};

use super::InventoryEngine;
use crate::audit::AuditEntry;
use crate::error::EngineError;
use crate::store::LedgerStore;

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    pub fn summary(&self, actor: &Identity) -> Result<InventorySummary, EngineError> {
        self.authorize(actor, Permission::Dashboard)?;
        let items = self.store.items()?;
        Ok(InventorySummary::from_items(&items)?)
    }

    /// The full ledger, newest first.
    pub fn transactions(&self, actor: &Identity) -> Result<Vec<StockTransaction>, EngineError> {
        self.authorize(actor, Permission::Reports)?;
        let mut transactions = self.store.transactions()?;
        transactions.reverse();
        Ok(transactions)
    }

    pub fn monthly_report(&self, actor: &Identity) -> Result<Vec<MonthlyActivity>, EngineError> {
        self.authorize(actor, Permission::Reports)?;
        let transactions = self.store.transactions()?;
        Ok(monthly_breakdown(&transactions))
    }

    /// The caller's own stock movements.
    pub fn my_activity(&self, actor: &Identity) -> Result<ActorActivity, EngineError> {
        self.authorize(actor, Permission::Dashboard)?;
        let transactions = self.store.transactions()?;
        Ok(actor_history(actor.user_id, &transactions))
    }

    /// Newest first.
    pub fn audit_log(&self, actor: &Identity) -> Result<Vec<AuditEntry>, EngineError> {
        self.authorize(actor, Permission::AuditLogs)?;
        let mut entries = self.store.audit_log()?;
        entries.reverse();
        Ok(entries)
    }
}
