use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{
    Aggregate, AggregateRoot, DomainError, Event, Money, StockShortfall, UserId, aggregate_id,
};

aggregate_id!(
    /// Inventory item identifier.
    InventoryItemId
);

/// Aggregate root: InventoryItem.
///
/// Owns the stock balance and the weighted-average unit cost. Only stock-in
/// recomputes `unit_cost`; stock-out and kit restocks move quantity alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    name: String,
    category: String,
    location: String,
    quantity: u64,
    min_stock: u64,
    unit_cost: Money,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Default reorder threshold for new items.
    pub const DEFAULT_MIN_STOCK: u64 = 5;
    pub const DEFAULT_LOCATION: &'static str = "Bin A";

    /// Create an empty, not-yet-defined aggregate instance.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            name: String::new(),
            category: String::new(),
            location: String::new(),
            quantity: 0,
            min_stock: 0,
            unit_cost: Money::ZERO,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn min_stock(&self) -> u64 {
        self.min_stock
    }

    pub fn unit_cost(&self) -> Money {
        self.unit_cost
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Below the reorder threshold (drives the shopping list).
    pub fn is_short(&self) -> bool {
        self.quantity < self.min_stock
    }

    /// At or below the threshold (drives the dashboard alert count).
    pub fn at_reorder_point(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// Shortfall record for a draw of `requested` units.
    pub fn shortfall(&self, requested: u64) -> StockShortfall {
        StockShortfall {
            item_id: self.id.as_aggregate(),
            item_name: self.name.clone(),
            available: self.quantity,
            requested,
        }
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DefineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineItem {
    pub item_id: InventoryItemId,
    pub name: String,
    pub category: String,
    pub location: String,
    pub min_stock: u64,
    pub unit_cost: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StockIn (a purchased batch; recomputes the average cost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIn {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub unit_cost: Money,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StockOut (reject-not-clamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOut {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Restock (quantity-only add-back at the current cost basis).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restock {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    DefineItem(DefineItem),
    StockIn(StockIn),
    StockOut(StockOut),
    Restock(Restock),
}

/// Event: ItemDefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefined {
    pub item_id: InventoryItemId,
    pub name: String,
    pub category: String,
    pub location: String,
    pub min_stock: u64,
    pub unit_cost: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub batch_unit_cost: Money,
    pub unit_cost_after: Money,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockRestored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestored {
    pub item_id: InventoryItemId,
    pub quantity: u64,
    pub actor: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemDefined(ItemDefined),
    StockReceived(StockReceived),
    StockIssued(StockIssued),
    StockRestored(StockRestored),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemDefined(_) => "inventory.item.defined",
            InventoryEvent::StockReceived(_) => "inventory.item.stock_received",
            InventoryEvent::StockIssued(_) => "inventory.item.stock_issued",
            InventoryEvent::StockRestored(_) => "inventory.item.stock_restored",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemDefined(e) => e.occurred_at,
            InventoryEvent::StockReceived(e) => e.occurred_at,
            InventoryEvent::StockIssued(e) => e.occurred_at,
            InventoryEvent::StockRestored(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemDefined(e) => {
                self.id = e.item_id;
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.location = e.location.clone();
                self.min_stock = e.min_stock;
                self.unit_cost = e.unit_cost;
                self.quantity = 0;
                self.created = true;
            }
            InventoryEvent::StockReceived(e) => {
                self.quantity += e.quantity;
                self.unit_cost = e.unit_cost_after;
            }
            InventoryEvent::StockIssued(e) => {
                self.quantity -= e.quantity;
            }
            InventoryEvent::StockRestored(e) => {
                self.quantity += e.quantity;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::DefineItem(cmd) => self.handle_define(cmd),
            InventoryCommand::StockIn(cmd) => self.handle_stock_in(cmd),
            InventoryCommand::StockOut(cmd) => self.handle_stock_out(cmd),
            InventoryCommand::Restock(cmd) => self.handle_restock(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found("item", self.id));
        }
        Ok(())
    }

    fn ensure_item_id(&self, item_id: InventoryItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn checked_increase(&self, quantity: u64) -> Result<u64, DomainError> {
        if quantity == 0 {
            return Err(DomainError::invalid("quantity must be positive"));
        }
        self.quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid("quantity overflow"))
    }

    fn handle_define(&self, cmd: &DefineItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("item already exists"));
        }
        self.ensure_item_id(cmd.item_id)?;

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("name cannot be empty"));
        }
        let location = match cmd.location.trim() {
            "" => Self::DEFAULT_LOCATION,
            loc => loc,
        };

        Ok(vec![InventoryEvent::ItemDefined(ItemDefined {
            item_id: cmd.item_id,
            name: name.to_string(),
            category: cmd.category.trim().to_string(),
            location: location.to_string(),
            min_stock: cmd.min_stock,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_stock_in(&self, cmd: &StockIn) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_item_id(cmd.item_id)?;
        self.checked_increase(cmd.quantity)?;

        let unit_cost_after =
            Money::weighted_average(self.quantity, self.unit_cost, cmd.quantity, cmd.unit_cost)?;

        Ok(vec![InventoryEvent::StockReceived(StockReceived {
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            batch_unit_cost: cmd.unit_cost,
            unit_cost_after,
            actor: cmd.actor,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_stock_out(&self, cmd: &StockOut) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_item_id(cmd.item_id)?;

        if cmd.quantity == 0 {
            return Err(DomainError::invalid("quantity must be positive"));
        }
        if cmd.quantity > self.quantity {
            return Err(DomainError::InsufficientStock(vec![
                self.shortfall(cmd.quantity),
            ]));
        }

        Ok(vec![InventoryEvent::StockIssued(StockIssued {
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            actor: cmd.actor,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restock(&self, cmd: &Restock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_item_id(cmd.item_id)?;
        self.checked_increase(cmd.quantity)?;

        Ok(vec![InventoryEvent::StockRestored(StockRestored {
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            actor: cmd.actor,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn defined(id: InventoryItemId) -> InventoryItem {
        let item = InventoryItem::empty(id);
        let (item, _) = item
            .decide(&InventoryCommand::DefineItem(DefineItem {
                item_id: id,
                name: "Servo SG90".to_string(),
                category: "Motors".to_string(),
                location: String::new(),
                min_stock: 5,
                unit_cost: Money::ZERO,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        item
    }

    fn stock_in(id: InventoryItemId, quantity: u64, cost: &str) -> InventoryCommand {
        InventoryCommand::StockIn(StockIn {
            item_id: id,
            quantity,
            unit_cost: money(cost),
            actor: UserId::new(),
            note: String::new(),
            occurred_at: Utc::now(),
        })
    }

    fn stock_out(id: InventoryItemId, quantity: u64) -> InventoryCommand {
        InventoryCommand::StockOut(StockOut {
            item_id: id,
            quantity,
            actor: UserId::new(),
            note: String::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn define_applies_default_location() {
        let item = defined(InventoryItemId::new());
        assert_eq!(item.location(), InventoryItem::DEFAULT_LOCATION);
        assert_eq!(item.version(), 1);
        assert!(item.is_short() || item.min_stock() == 0);
    }

    #[test]
    fn weighted_average_cost_after_two_batches() {
        let id = InventoryItemId::new();
        let item = defined(id);
        let (item, _) = item.decide(&stock_in(id, 10, "100")).unwrap();
        let (item, _) = item.decide(&stock_in(id, 10, "200")).unwrap();

        assert_eq!(item.quantity(), 20);
        assert_eq!(item.unit_cost(), money("150"));
    }

    #[test]
    fn zero_quantity_stock_in_is_rejected() {
        let id = InventoryItemId::new();
        let err = defined(id).handle(&stock_in(id, 0, "1")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn stock_out_beyond_balance_reports_available_and_requested() {
        let id = InventoryItemId::new();
        let (item, _) = defined(id).decide(&stock_in(id, 3, "10")).unwrap();

        match item.handle(&stock_out(id, 5)).unwrap_err() {
            DomainError::InsufficientStock(s) => {
                assert_eq!(s.len(), 1);
                assert_eq!(s[0].available, 3);
                assert_eq!(s[0].requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn stock_out_keeps_unit_cost() {
        let id = InventoryItemId::new();
        let (item, _) = defined(id).decide(&stock_in(id, 10, "12.5")).unwrap();
        let (item, _) = item.decide(&stock_out(id, 4)).unwrap();
        assert_eq!(item.quantity(), 6);
        assert_eq!(item.unit_cost(), money("12.5"));
    }

    #[test]
    fn restock_does_not_touch_cost() {
        let id = InventoryItemId::new();
        let (item, _) = defined(id).decide(&stock_in(id, 10, "40")).unwrap();
        let (item, _) = item
            .decide(&InventoryCommand::Restock(Restock {
                item_id: id,
                quantity: 5,
                actor: UserId::new(),
                note: "Kit Return".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(item.quantity(), 15);
        assert_eq!(item.unit_cost(), money("40"));
    }

    #[test]
    fn commands_on_undefined_item_are_not_found() {
        let id = InventoryItemId::new();
        let err = InventoryItem::empty(id).handle(&stock_out(id, 1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "item", .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: across any sequence of stock-in/out, the balance equals
        /// accepted ins minus accepted outs, and a rejected stock-out leaves
        /// quantity and unit cost untouched.
        #[test]
        fn balance_tracks_accepted_movements(
            ops in prop::collection::vec((any::<bool>(), 1u64..50, 0i64..10_000), 1..40)
        ) {
            let id = InventoryItemId::new();
            let mut item = defined(id);
            let mut expected: u64 = 0;

            for (is_in, qty, cents) in ops {
                let cmd = if is_in {
                    stock_in(id, qty, &format!("{}.{:02}", cents / 100, cents % 100))
                } else {
                    stock_out(id, qty)
                };

                match item.decide(&cmd) {
                    Ok((next, _)) => {
                        if is_in { expected += qty } else { expected -= qty }
                        item = next;
                    }
                    Err(DomainError::InsufficientStock(_)) => {
                        prop_assert!(!is_in);
                        prop_assert!(qty > item.quantity());
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                }
                prop_assert_eq!(item.quantity(), expected);
            }
        }
    }
}
