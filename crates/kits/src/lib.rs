//! Kit registry domain.
//!
//! A kit is a fixed bill of materials over inventory items plus a counter of
//! how many instances are out on loan. Issue and return never touch item
//! balances directly: the planner computes the per-item draws and the engine
//! commits them together with the kit in one atomic unit.

pub mod history;
pub mod kit;
pub mod plan;

pub use history::{KitAction, KitEventRecord};
pub use kit::{
    ComponentDropped, DefineKit, DropComponent, IssueKits, Kit, KitCommand, KitComponent,
    KitDefined, KitEvent, KitId, KitsIssued, KitsReturned, ReturnKits, issue_note, return_note,
};
pub use plan::{ComponentDraw, plan_issue, plan_return, required_draws};
