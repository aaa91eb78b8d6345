//! Shortage scan and purchase orders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use labstock_auth::{CredentialStore, Identity, Permission};
use labstock_core::DomainError;
use labstock_inventory::{InventoryItem, InventoryItemId};
use labstock_numbering::DocumentKind;
use labstock_purchasing::{
    PurchaseMode, PurchaseOrder, PurchaseOrderId, PurchaseRequestDraft, RequestLineInput,
    build_request, list_shortages,
};

use super::InventoryEngine;
use crate::audit::{AuditAction, AuditEntry};
use crate::error::EngineError;
use crate::store::{ChangeSet, LedgerStore, Mutation};

/// What the caller picked in the request wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    pub lines: Vec<RequestLineInput>,
    pub required_by: NaiveDate,
    pub mode: PurchaseMode,
}

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    /// Items strictly below their minimum stock.
    pub fn list_shortages(&self, actor: &Identity) -> Result<Vec<InventoryItem>, EngineError> {
        self.authorize(actor, Permission::ShoppingList)?;
        let items = self.store.items()?;
        Ok(list_shortages(&items))
    }

    /// Price a request against current unit costs. Nothing is persisted; the
    /// returned draft belongs to the caller until [`Self::commit_request`].
    pub fn build_request(
        &self,
        actor: &Identity,
        params: &RequestParams,
    ) -> Result<PurchaseRequestDraft, EngineError> {
        self.authorize(actor, Permission::PurchaseOrders)?;
        let ids: Vec<InventoryItemId> = params.lines.iter().map(|l| l.item_id).collect();
        let items = self.store.items_by_id(&ids)?;

        Ok(build_request(
            &items,
            &params.lines,
            actor.user_id,
            &actor.name,
            params.required_by,
            &params.mode,
            self.now(),
        )?)
    }

    /// Freeze `draft` as a purchase order under a new PO number.
    #[instrument(skip(self, actor, draft), fields(actor = %actor.employee_id, lines = draft.lines.len()))]
    pub fn commit_request(
        &self,
        actor: &Identity,
        draft: &PurchaseRequestDraft,
    ) -> Result<PurchaseOrder, EngineError> {
        self.authorize(actor, Permission::PurchaseOrders)?;
        if draft.requester != actor.user_id {
            return Err(EngineError::InvalidArgument(
                "a purchase request can only be committed by the user who prepared it".to_string(),
            ));
        }

        let order_id = PurchaseOrderId::new();
        let mut lost: Option<u64> = None;

        let order = self.retry.run("commit_request", |_| {
            let now = self.now();
            let allocated =
                self.allocator
                    .candidate(&self.store, DocumentKind::PurchaseOrder, now, lost)?;
            lost = Some(allocated.sequence);

            let order = PurchaseOrder::from_draft(order_id, allocated.number, draft, now)?;

            let mut changes = ChangeSet::new();
            changes.push(Mutation::InsertPurchaseOrder(order.clone()));
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::PurchaseOrderCommitted,
                &order.po_number,
                format!(
                    "{} line(s), {} unit(s), estimated {}",
                    order.lines.len(),
                    order.total_items,
                    order.estimated_total
                ),
                now,
            ));
            self.store.commit(changes)?;
            Ok(order)
        })?;

        info!(po_number = %order.po_number, "purchase order committed");
        Ok(order)
    }

    pub fn purchase_orders(&self, actor: &Identity) -> Result<Vec<PurchaseOrder>, EngineError> {
        self.authorize(actor, Permission::PurchaseOrders)?;
        Ok(self.store.purchase_orders()?)
    }

    pub fn purchase_order(
        &self,
        actor: &Identity,
        order_id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, EngineError> {
        self.authorize(actor, Permission::PurchaseOrders)?;
        self.store
            .purchase_order(order_id)?
            .ok_or_else(|| DomainError::not_found("purchase_order", order_id).into())
    }

    /// Administrative removal of a committed order.
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub fn delete_purchase_order(
        &self,
        actor: &Identity,
        order_id: PurchaseOrderId,
    ) -> Result<(), EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        let order = self
            .store
            .purchase_order(order_id)?
            .ok_or_else(|| DomainError::not_found("purchase_order", order_id))?;

        let mut changes = ChangeSet::new();
        changes.push(Mutation::RemovePurchaseOrder(order_id));
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::PurchaseOrderDeleted,
            &order.po_number,
            "",
            self.now(),
        ));
        self.store.commit(changes)?;

        info!(po_number = %order.po_number, "purchase order deleted");
        Ok(())
    }
}
