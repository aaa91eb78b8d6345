use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult, Entity, Money, UserId, aggregate_id};

use crate::request::{PurchaseRequestDraft, RequestLine};

aggregate_id!(
    /// Purchase order identifier.
    PurchaseOrderId
);

/// Purchase order status.
///
/// Orders are frozen at commit; there is no transition out of `Submitted`
/// other than an administrative delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    #[default]
    Submitted,
}

/// Point-in-time snapshot of a confirmed purchase request.
///
/// Never recomputed from live inventory after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub creator: UserId,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    pub required_by: NaiveDate,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<RequestLine>,
    pub total_items: u64,
    pub estimated_total: Money,
}

impl PurchaseOrder {
    /// Freeze `draft` under an allocated `po_number`.
    pub fn from_draft(
        id: PurchaseOrderId,
        po_number: impl Into<String>,
        draft: &PurchaseRequestDraft,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let po_number = po_number.into();
        if po_number.trim().is_empty() {
            return Err(DomainError::invariant("po_number must be allocated before commit"));
        }
        if draft.lines.is_empty() {
            return Err(DomainError::invalid("cannot commit an empty purchase request"));
        }

        Ok(Self {
            id,
            po_number,
            creator: draft.requester,
            creator_name: draft.requester_name.clone(),
            created_at,
            required_by: draft.required_by,
            status: PurchaseOrderStatus::Submitted,
            lines: draft.lines.clone(),
            total_items: draft.total_items,
            estimated_total: draft.estimated_total,
        })
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
