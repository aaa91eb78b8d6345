//! Dashboard headline figures.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use labstock_core::{DomainResult, Money};

use crate::item::InventoryItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub item_count: usize,
    pub total_units: u64,
    /// Sum of `quantity * unit_cost` over every item.
    pub total_value: Money,
    /// Items at or below their reorder threshold.
    pub alert_count: usize,
    pub category_count: usize,
}

impl InventorySummary {
    pub fn from_items<'a, I>(items: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a InventoryItem>,
    {
        let mut summary = InventorySummary {
            item_count: 0,
            total_units: 0,
            total_value: Money::ZERO,
            alert_count: 0,
            category_count: 0,
        };
        let mut categories = BTreeSet::new();

        for item in items {
            summary.item_count += 1;
            summary.total_units = summary.total_units.saturating_add(item.quantity());
            summary.total_value = summary
                .total_value
                .checked_add(item.unit_cost().times(item.quantity())?)?;
            if item.at_reorder_point() {
                summary.alert_count += 1;
            }
            categories.insert(item.category());
        }

        summary.category_count = categories.len();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{DefineItem, InventoryCommand, InventoryItemId, StockIn};
    use chrono::Utc;
    use labstock_core::{Aggregate, UserId};

    fn item(category: &str, qty: u64, cost: &str, min_stock: u64) -> InventoryItem {
        let id = InventoryItemId::new();
        let (item, _) = InventoryItem::empty(id)
            .decide(&InventoryCommand::DefineItem(DefineItem {
                item_id: id,
                name: format!("{category} part"),
                category: category.to_string(),
                location: String::new(),
                min_stock,
                unit_cost: Money::ZERO,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        if qty == 0 {
            return item;
        }
        let (item, _) = item
            .decide(&InventoryCommand::StockIn(StockIn {
                item_id: id,
                quantity: qty,
                unit_cost: cost.parse().unwrap(),
                actor: UserId::new(),
                note: String::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        item
    }

    #[test]
    fn empty_ledger_has_zero_summary() {
        let summary = InventorySummary::from_items(Vec::<&InventoryItem>::new()).unwrap();
        assert_eq!(summary.total_units, 0);
        assert_eq!(summary.total_value, Money::ZERO);
        assert_eq!(summary.category_count, 0);
    }

    #[test]
    fn aggregates_value_alerts_and_categories() {
        let items = vec![
            item("Sensors", 10, "2.5", 5),
            item("Sensors", 5, "10", 5),
            item("Motors", 0, "0", 2),
        ];
        let summary = InventorySummary::from_items(&items).unwrap();

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.total_units, 15);
        assert_eq!(summary.total_value, "75".parse().unwrap());
        // 5 <= 5 and 0 <= 2
        assert_eq!(summary.alert_count, 2);
        assert_eq!(summary.category_count, 2);
    }
}
