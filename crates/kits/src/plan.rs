//! Component draw planning for kit issue/return.
//!
//! Planning is the check half of check-then-act: it reads every BOM item
//! once, and either returns the full list of draws or fails naming every
//! deficient item. The caller must commit the draws against the same item
//! versions it planned with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult};
use labstock_inventory::{InventoryItem, InventoryItemId};

use crate::kit::{Kit, KitComponent};

/// Total quantity of one item moved by an issue or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDraw {
    pub item_id: InventoryItemId,
    pub quantity: u64,
}

/// `quantity_per_kit * count` per item. Lines naming the same item are
/// summed; order follows first appearance in the BOM.
pub fn required_draws(components: &[KitComponent], count: u64) -> DomainResult<Vec<ComponentDraw>> {
    let mut draws: Vec<ComponentDraw> = Vec::with_capacity(components.len());

    for line in components {
        let quantity = line
            .quantity_per_kit
            .checked_mul(count)
            .ok_or_else(|| DomainError::invalid("component quantity overflow"))?;

        match draws.iter_mut().find(|d| d.item_id == line.item_id) {
            Some(draw) => {
                draw.quantity = draw
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::invalid("component quantity overflow"))?;
            }
            None => draws.push(ComponentDraw {
                item_id: line.item_id,
                quantity,
            }),
        }
    }

    Ok(draws)
}

/// Plan an issue of `count` kits against current item balances.
///
/// Fails with `InsufficientStock` listing every short item, or `NotFound`
/// if a BOM item no longer exists.
pub fn plan_issue(
    kit: &Kit,
    count: u64,
    items: &BTreeMap<InventoryItemId, InventoryItem>,
) -> DomainResult<Vec<ComponentDraw>> {
    if count == 0 {
        return Err(DomainError::invalid("kit count must be positive"));
    }

    let draws = required_draws(kit.components(), count)?;
    let mut shortfalls = Vec::new();

    for draw in &draws {
        let item = items
            .get(&draw.item_id)
            .ok_or_else(|| DomainError::not_found("item", draw.item_id))?;
        if item.quantity() < draw.quantity {
            shortfalls.push(item.shortfall(draw.quantity));
        }
    }

    if !shortfalls.is_empty() {
        return Err(DomainError::InsufficientStock(shortfalls));
    }
    Ok(draws)
}

/// Plan a return of `count` kits. Rejects over-returns before any draw is
/// computed.
pub fn plan_return(kit: &Kit, count: u64) -> DomainResult<Vec<ComponentDraw>> {
    if count == 0 {
        return Err(DomainError::invalid("kit count must be positive"));
    }
    if count > kit.in_circulation() {
        return Err(DomainError::invalid(format!(
            "cannot return {count} of kit {}: only {} in circulation",
            kit.kit_ref(),
            kit.in_circulation()
        )));
    }
    required_draws(kit.components(), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::{DefineKit, IssueKits, KitCommand, KitId};
    use chrono::Utc;
    use labstock_core::{Aggregate, Money, UserId};
    use labstock_inventory::{DefineItem, InventoryCommand, Restock, StockIn, StockOut};
    use proptest::prelude::*;

    fn item(name: &str, qty: u64) -> InventoryItem {
        let id = InventoryItemId::new();
        let (item, _) = InventoryItem::empty(id)
            .decide(&InventoryCommand::DefineItem(DefineItem {
                item_id: id,
                name: name.to_string(),
                category: "Sensors".to_string(),
                location: String::new(),
                min_stock: 5,
                unit_cost: Money::ZERO,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        if qty == 0 {
            return item;
        }
        item.decide(&InventoryCommand::StockIn(StockIn {
            item_id: id,
            quantity: qty,
            unit_cost: "3.25".parse().unwrap(),
            actor: UserId::new(),
            note: String::new(),
            occurred_at: Utc::now(),
        }))
        .unwrap()
        .0
    }

    fn kit(components: Vec<KitComponent>) -> Kit {
        let id = KitId::new();
        Kit::empty(id)
            .decide(&KitCommand::DefineKit(DefineKit {
                kit_id: id,
                kit_ref: "KIT-1".to_string(),
                name: "Starter".to_string(),
                description: String::new(),
                creator: UserId::new(),
                components,
                occurred_at: Utc::now(),
            }))
            .unwrap()
            .0
    }

    fn index(items: &[InventoryItem]) -> BTreeMap<InventoryItemId, InventoryItem> {
        items.iter().map(|i| (i.id_typed(), i.clone())).collect()
    }

    #[test]
    fn duplicate_lines_are_summed() {
        let id = InventoryItemId::new();
        let draws = required_draws(
            &[
                KitComponent { item_id: id, quantity_per_kit: 2 },
                KitComponent { item_id: id, quantity_per_kit: 3 },
            ],
            4,
        )
        .unwrap();
        assert_eq!(draws, vec![ComponentDraw { item_id: id, quantity: 20 }]);
    }

    #[test]
    fn every_deficient_item_is_reported() {
        let a = item("A", 10);
        let b = item("B", 3);
        let c = item("C", 1);
        let k = kit(vec![
            KitComponent { item_id: a.id_typed(), quantity_per_kit: 5 },
            KitComponent { item_id: b.id_typed(), quantity_per_kit: 5 },
            KitComponent { item_id: c.id_typed(), quantity_per_kit: 5 },
        ]);

        match plan_issue(&k, 1, &index(&[a, b, c])).unwrap_err() {
            DomainError::InsufficientStock(s) => {
                let names: Vec<_> = s.iter().map(|s| s.item_name.as_str()).collect();
                assert_eq!(names, ["B", "C"]);
                assert_eq!((s[0].available, s[0].requested), (3, 5));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn missing_bom_item_is_not_found() {
        let k = kit(vec![KitComponent {
            item_id: InventoryItemId::new(),
            quantity_per_kit: 1,
        }]);
        let err = plan_issue(&k, 1, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "item", .. }));
    }

    #[test]
    fn return_beyond_circulation_is_rejected() {
        let a = item("A", 10);
        let k = kit(vec![KitComponent { item_id: a.id_typed(), quantity_per_kit: 1 }]);
        let err = plan_return(&k, 1).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(msg) if msg.contains("only 0")));
    }

    proptest! {
        /// Issuing n kits and returning n kits restores every component
        /// balance and the circulation counter exactly.
        #[test]
        fn issue_return_round_trip(
            per_kit in prop::collection::vec(1u64..5, 1..5),
            stock in 0u64..60,
            count in 1u64..6,
        ) {
            let items: Vec<_> = per_kit.iter().enumerate()
                .map(|(i, _)| item(&format!("part-{i}"), stock))
                .collect();
            let components: Vec<_> = items.iter().zip(&per_kit)
                .map(|(i, q)| KitComponent { item_id: i.id_typed(), quantity_per_kit: *q })
                .collect();
            let k = kit(components);
            let mut balances = index(&items);
            let before = balances.clone();

            let draws = match plan_issue(&k, count, &balances) {
                Ok(draws) => draws,
                Err(DomainError::InsufficientStock(_)) => {
                    prop_assert!(per_kit.iter().any(|q| q * count > stock));
                    return Ok(());
                }
                Err(other) => return Err(TestCaseError::fail(format!("{other:?}"))),
            };

            for draw in &draws {
                let current = &balances[&draw.item_id];
                let (next, _) = current.decide(&InventoryCommand::StockOut(StockOut {
                    item_id: draw.item_id,
                    quantity: draw.quantity,
                    actor: UserId::new(),
                    note: String::new(),
                    occurred_at: Utc::now(),
                })).unwrap();
                balances.insert(draw.item_id, next);
            }
            let (k, _) = k.decide(&KitCommand::IssueKits(IssueKits {
                kit_id: k.id_typed(),
                count,
                actor: UserId::new(),
                note: String::new(),
                occurred_at: Utc::now(),
            })).unwrap();

            for draw in plan_return(&k, count).unwrap() {
                let current = &balances[&draw.item_id];
                let (next, _) = current.decide(&InventoryCommand::Restock(Restock {
                    item_id: draw.item_id,
                    quantity: draw.quantity,
                    actor: UserId::new(),
                    note: String::new(),
                    occurred_at: Utc::now(),
                })).unwrap();
                balances.insert(draw.item_id, next);
            }

            for (id, original) in &before {
                prop_assert_eq!(balances[id].quantity(), original.quantity());
                prop_assert_eq!(balances[id].unit_cost(), original.unit_cost());
            }
        }
    }
}
