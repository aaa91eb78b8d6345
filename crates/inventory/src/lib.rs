//! Stock ledger domain.
//!
//! Business rules for inventory items, stock movements and the read-side
//! summaries built from them. Pure domain logic: no IO, no HTTP, no storage.

pub mod category;
pub mod item;
pub mod report;
pub mod summary;
pub mod transaction;

pub use category::{Category, DEFAULT_CATEGORIES};
pub use item::{
    DefineItem, InventoryCommand, InventoryEvent, InventoryItem, InventoryItemId, ItemDefined,
    Restock, StockIn, StockIssued, StockOut, StockReceived, StockRestored,
};
pub use report::{ActorActivity, MonthlyActivity, actor_history, monthly_breakdown};
pub use summary::InventorySummary;
pub use transaction::{StockTransaction, TransactionId, TransactionKind};
