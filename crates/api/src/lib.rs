//! HTTP adapter over the inventory engine.
//!
//! Handlers translate JSON to engine calls and engine errors to status codes.
//! Every rule (permissions, balances, numbering) lives in the engine.

pub mod app;
pub mod context;
pub mod middleware;
