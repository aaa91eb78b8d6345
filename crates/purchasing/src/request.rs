//! Purchase request drafting.
//!
//! The draft is owned by the caller between the "pick items" and "confirm"
//! steps; building one is pure and may be repeated freely.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult, Money, UserId};
use labstock_inventory::{InventoryItem, InventoryItemId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PurchaseMode {
    Online { link: String },
    Offline,
}

impl PurchaseMode {
    fn validate(&self) -> DomainResult<()> {
        match self {
            PurchaseMode::Online { link } if link.trim().is_empty() => {
                Err(DomainError::invalid("online purchases need a link"))
            }
            _ => Ok(()),
        }
    }
}

/// What the caller asks for, per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLineInput {
    pub item_id: InventoryItemId,
    pub requested_quantity: u64,
    #[serde(default)]
    pub justification: String,
    /// Overrides the request-wide mode for this line.
    #[serde(default)]
    pub mode: Option<PurchaseMode>,
}

/// A priced line, with the unit cost captured at draft time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub category: String,
    pub requested_quantity: u64,
    pub unit_cost: Money,
    pub estimated_cost: Money,
    pub justification: String,
    pub mode: PurchaseMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestDraft {
    pub requester: UserId,
    pub requester_name: String,
    pub prepared_at: DateTime<Utc>,
    pub required_by: NaiveDate,
    pub lines: Vec<RequestLine>,
    /// Sum of requested quantities across lines.
    pub total_items: u64,
    pub estimated_total: Money,
}

/// Price `inputs` against the current ledger view.
///
/// # Errors
/// - `InvalidArgument` for an empty request, a zero quantity, a duplicated
///   item, an online line without a link, or a `required_by` before the
///   preparation date.
/// - `NotFound` for an unknown item.
pub fn build_request(
    items: &BTreeMap<InventoryItemId, InventoryItem>,
    inputs: &[RequestLineInput],
    requester: UserId,
    requester_name: &str,
    required_by: NaiveDate,
    mode: &PurchaseMode,
    prepared_at: DateTime<Utc>,
) -> DomainResult<PurchaseRequestDraft> {
    if inputs.is_empty() {
        return Err(DomainError::invalid("a purchase request needs at least one line"));
    }
    if required_by < prepared_at.date_naive() {
        return Err(DomainError::invalid(format!(
            "required-by date {required_by} is in the past"
        )));
    }
    mode.validate()?;

    let mut seen = BTreeSet::new();
    let mut lines = Vec::with_capacity(inputs.len());
    let mut total_items: u64 = 0;
    let mut estimated_total = Money::ZERO;

    for input in inputs {
        if input.requested_quantity == 0 {
            return Err(DomainError::invalid(format!(
                "requested quantity must be positive (item {})",
                input.item_id
            )));
        }
        if !seen.insert(input.item_id) {
            return Err(DomainError::invalid(format!(
                "item {} appears more than once",
                input.item_id
            )));
        }

        let item = items
            .get(&input.item_id)
            .ok_or_else(|| DomainError::not_found("item", input.item_id))?;

        let line_mode = input.mode.clone().unwrap_or_else(|| mode.clone());
        line_mode.validate()?;

        let estimated_cost = item.unit_cost().times(input.requested_quantity)?;
        total_items = total_items
            .checked_add(input.requested_quantity)
            .ok_or_else(|| DomainError::invalid("quantity overflow"))?;
        estimated_total = estimated_total.checked_add(estimated_cost)?;

        lines.push(RequestLine {
            item_id: input.item_id,
            item_name: item.name().to_string(),
            category: item.category().to_string(),
            requested_quantity: input.requested_quantity,
            unit_cost: item.unit_cost(),
            estimated_cost,
            justification: input.justification.trim().to_string(),
            mode: line_mode,
        });
    }

    Ok(PurchaseRequestDraft {
        requester,
        requester_name: requester_name.to_string(),
        prepared_at,
        required_by,
        lines,
        total_items,
        estimated_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use labstock_core::Aggregate;
    use labstock_inventory::{DefineItem, InventoryCommand, StockIn};

    fn ledger(entries: &[(&str, &str)]) -> BTreeMap<InventoryItemId, InventoryItem> {
        entries
            .iter()
            .map(|(name, cost)| {
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
                let (item, _) = item
                    .decide(&InventoryCommand::StockIn(StockIn {
                        item_id: id,
                        quantity: 1,
                        unit_cost: cost.parse().unwrap(),
                        actor: UserId::new(),
                        note: String::new(),
                        occurred_at: Utc::now(),
                    }))
                    .unwrap();
                (id, item)
            })
            .collect()
    }

    fn input(id: InventoryItemId, qty: u64) -> RequestLineInput {
        RequestLineInput {
            item_id: id,
            requested_quantity: qty,
            justification: "robotics club".to_string(),
            mode: None,
        }
    }

    fn tomorrow() -> NaiveDate {
        (Utc::now() + Duration::days(1)).date_naive()
    }

    #[test]
    fn lines_are_priced_from_the_current_unit_cost() {
        let items = ledger(&[("Ultrasonic", "45.5"), ("IR pair", "12")]);
        let id_of = |name: &str| {
            items
                .values()
                .find(|i| i.name() == name)
                .map(|i| i.id_typed())
                .unwrap()
        };
        let draft = build_request(
            &items,
            &[input(id_of("Ultrasonic"), 4), input(id_of("IR pair"), 10)],
            UserId::new(),
            "Asha",
            tomorrow(),
            &PurchaseMode::Offline,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(draft.total_items, 14);
        let costs: Money = draft
            .lines
            .iter()
            .try_fold(Money::ZERO, |acc, l| acc.checked_add(l.estimated_cost))
            .unwrap();
        assert_eq!(costs, draft.estimated_total);
        assert_eq!(draft.estimated_total, "302".parse().unwrap());
    }

    #[test]
    fn online_mode_requires_link() {
        let items = ledger(&[("Servo", "3")]);
        let id = *items.keys().next().unwrap();
        let err = build_request(
            &items,
            &[input(id, 1)],
            UserId::new(),
            "Asha",
            tomorrow(),
            &PurchaseMode::Online { link: " ".to_string() },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_zero_quantities_duplicates_and_unknown_items() {
        let items = ledger(&[("Servo", "3")]);
        let id = *items.keys().next().unwrap();
        let build = |inputs: &[RequestLineInput]| {
            build_request(
                &items,
                inputs,
                UserId::new(),
                "Asha",
                tomorrow(),
                &PurchaseMode::Offline,
                Utc::now(),
            )
        };

        assert!(build(&[]).is_err());
        assert!(build(&[input(id, 0)]).is_err());
        assert!(build(&[input(id, 1), input(id, 2)]).is_err());
        assert!(matches!(
            build(&[input(InventoryItemId::new(), 1)]),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn mode_serializes_with_tag() {
        let json = serde_json::to_value(PurchaseMode::Online {
            link: "https://shop.example/servo".to_string(),
        })
        .unwrap();
        assert_eq!(json["mode"], "online");
        assert_eq!(json["link"], "https://shop.example/servo");
    }
}
