//! Transaction reports: monthly rollups and per-actor history.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use labstock_core::UserId;

use crate::transaction::{StockTransaction, TransactionKind};

/// Movement totals for one calendar month (`YYYY-MM`, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub month: String,
    pub transaction_count: usize,
    pub units_in: u64,
    pub units_out: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorActivity {
    pub actor: UserId,
    pub units_in: u64,
    pub units_out: u64,
    /// Newest first.
    pub transactions: Vec<StockTransaction>,
}

fn add_units(kind: TransactionKind, quantity: u64, units_in: &mut u64, units_out: &mut u64) {
    match kind {
        TransactionKind::In => *units_in = units_in.saturating_add(quantity),
        TransactionKind::Out => *units_out = units_out.saturating_add(quantity),
    }
}

/// Monthly rollup, newest month first.
pub fn monthly_breakdown<'a, I>(transactions: I) -> Vec<MonthlyActivity>
where
    I: IntoIterator<Item = &'a StockTransaction>,
{
    let mut months: BTreeMap<(i32, u32), MonthlyActivity> = BTreeMap::new();

    for tx in transactions {
        let key = (tx.occurred_at.year(), tx.occurred_at.month());
        let entry = months.entry(key).or_insert_with(|| MonthlyActivity {
            month: format!("{:04}-{:02}", key.0, key.1),
            transaction_count: 0,
            units_in: 0,
            units_out: 0,
        });
        entry.transaction_count += 1;
        add_units(tx.kind, tx.quantity, &mut entry.units_in, &mut entry.units_out);
    }

    months.into_values().rev().collect()
}

/// Everything `actor` moved, newest first.
pub fn actor_history<'a, I>(actor: UserId, transactions: I) -> ActorActivity
where
    I: IntoIterator<Item = &'a StockTransaction>,
{
    let mut activity = ActorActivity {
        actor,
        units_in: 0,
        units_out: 0,
        transactions: Vec::new(),
    };

    for tx in transactions.into_iter().filter(|tx| tx.actor == actor) {
        add_units(tx.kind, tx.quantity, &mut activity.units_in, &mut activity.units_out);
        activity.transactions.push(tx.clone());
    }

    activity
        .transactions
        .sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    activity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::InventoryItemId;
    use crate::transaction::TransactionId;
    use chrono::{TimeZone, Utc};

    fn tx(actor: UserId, kind: TransactionKind, qty: u64, y: i32, m: u32, d: u32) -> StockTransaction {
        StockTransaction {
            id: TransactionId::new(),
            item_id: InventoryItemId::new(),
            item_name: "LED".to_string(),
            kind,
            quantity: qty,
            actor,
            actor_name: "Asha".to_string(),
            occurred_at: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            note: String::new(),
        }
    }

    #[test]
    fn months_are_listed_newest_first() {
        let a = UserId::new();
        let txs = vec![
            tx(a, TransactionKind::In, 10, 2025, 3, 31),
            tx(a, TransactionKind::Out, 4, 2025, 4, 1),
            tx(a, TransactionKind::In, 2, 2025, 4, 20),
            tx(a, TransactionKind::Out, 1, 2024, 12, 5),
        ];

        let months = monthly_breakdown(&txs);
        let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, ["2025-04", "2025-03", "2024-12"]);
        assert_eq!(months[0].transaction_count, 2);
        assert_eq!(months[0].units_in, 2);
        assert_eq!(months[0].units_out, 4);
    }

    #[test]
    fn actor_history_filters_and_orders() {
        let a = UserId::new();
        let b = UserId::new();
        let txs = vec![
            tx(a, TransactionKind::In, 10, 2025, 1, 1),
            tx(b, TransactionKind::In, 7, 2025, 1, 2),
            tx(a, TransactionKind::Out, 3, 2025, 2, 1),
        ];

        let history = actor_history(a, &txs);
        assert_eq!(history.transactions.len(), 2);
        assert_eq!(history.transactions[0].quantity, 3);
        assert_eq!(history.units_in, 10);
        assert_eq!(history.units_out, 3);
    }
}
