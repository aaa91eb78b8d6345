//! Immutable stock movement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{UserId, aggregate_id};

use crate::item::{InventoryEvent, InventoryItemId};

aggregate_id!(
    /// Stock transaction identifier.
    TransactionId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    In,
    Out,
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransactionKind::In => write!(f, "IN"),
            TransactionKind::Out => write!(f, "OUT"),
        }
    }
}

/// One quantity movement, written in the same commit as the balance change.
///
/// The item name and actor name are copied at write time so history still
/// reads correctly after an item is deleted or a user is renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub kind: TransactionKind,
    pub quantity: u64,
    pub actor: UserId,
    pub actor_name: String,
    pub occurred_at: DateTime<Utc>,
    pub note: String,
}

impl StockTransaction {
    /// Ledger record for a quantity-moving event; `None` for definitions.
    pub fn from_event(
        event: &InventoryEvent,
        item_name: &str,
        actor_name: &str,
    ) -> Option<StockTransaction> {
        let (item_id, kind, quantity, actor, note, occurred_at) = match event {
            InventoryEvent::ItemDefined(_) => return None,
            InventoryEvent::StockReceived(e) => (
                e.item_id,
                TransactionKind::In,
                e.quantity,
                e.actor,
                &e.note,
                e.occurred_at,
            ),
            InventoryEvent::StockRestored(e) => (
                e.item_id,
                TransactionKind::In,
                e.quantity,
                e.actor,
                &e.note,
                e.occurred_at,
            ),
            InventoryEvent::StockIssued(e) => (
                e.item_id,
                TransactionKind::Out,
                e.quantity,
                e.actor,
                &e.note,
                e.occurred_at,
            ),
        };

        Some(StockTransaction {
            id: TransactionId::new(),
            item_id,
            item_name: item_name.to_string(),
            kind,
            quantity,
            actor,
            actor_name: actor_name.to_string(),
            occurred_at,
            note: note.clone(),
        })
    }

    /// Signed quantity delta (`+` for IN, `-` for OUT).
    pub fn signed_quantity(&self) -> i128 {
        match self.kind {
            TransactionKind::In => i128::from(self.quantity),
            TransactionKind::Out => -i128::from(self.quantity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemDefined, StockIssued, StockRestored};
    use labstock_core::Money;

    #[test]
    fn definitions_do_not_produce_transactions() {
        let event = InventoryEvent::ItemDefined(ItemDefined {
            item_id: InventoryItemId::new(),
            name: "Arduino Uno".to_string(),
            category: "Microcontrollers".to_string(),
            location: "Bin A".to_string(),
            min_stock: 5,
            unit_cost: Money::ZERO,
            occurred_at: Utc::now(),
        });
        assert!(StockTransaction::from_event(&event, "Arduino Uno", "Admin").is_none());
    }

    #[test]
    fn restores_are_recorded_as_in() {
        let event = InventoryEvent::StockRestored(StockRestored {
            item_id: InventoryItemId::new(),
            quantity: 4,
            actor: UserId::new(),
            note: "Kit Return: 2x KIT-1".to_string(),
            occurred_at: Utc::now(),
        });
        let tx = StockTransaction::from_event(&event, "LED", "Admin").unwrap();
        assert_eq!(tx.kind, TransactionKind::In);
        assert_eq!(tx.signed_quantity(), 4);
    }

    #[test]
    fn issues_are_recorded_as_out() {
        let event = InventoryEvent::StockIssued(StockIssued {
            item_id: InventoryItemId::new(),
            quantity: 3,
            actor: UserId::new(),
            note: String::new(),
            occurred_at: Utc::now(),
        });
        let tx = StockTransaction::from_event(&event, "LED", "Admin").unwrap();
        assert_eq!(tx.kind, TransactionKind::Out);
        assert_eq!(tx.signed_quantity(), -3);
        assert_eq!(serde_json::to_value(tx.kind).unwrap(), "OUT");
    }
}
