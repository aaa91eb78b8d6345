//! Procurement domain.
//!
//! Reads the stock ledger to find shortages, turns a caller-owned draft into
//! priced request lines, and freezes the result as an immutable purchase
//! order snapshot. Nothing here writes to the ledger.

pub mod order;
pub mod request;
pub mod shortage;

pub use order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus};
pub use request::{
    PurchaseMode, PurchaseRequestDraft, RequestLine, RequestLineInput, build_request,
};
pub use shortage::{deficit, list_shortages};
