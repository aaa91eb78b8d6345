//! Fiscal-year scoped document numbers.
//!
//! Identifiers look like `ORG/DOMAIN/TYPE/{fiscal_year}/{sequence}`. This
//! crate only formats and parses them; allocation (and the uniqueness
//! guarantee) lives with the store.

pub mod fiscal_year;
pub mod scheme;

pub use fiscal_year::FiscalYear;
pub use scheme::{DocumentKind, DocumentNumber, NumberingScheme};
