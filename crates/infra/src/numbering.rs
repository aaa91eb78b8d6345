//! Document number allocation.
//!
//! A candidate number is one past the highest sequence already issued for
//! the kind in the fiscal year. Numbers of deleted documents stay issued, so
//! gaps are never refilled. The scan is racy on its own; uniqueness comes
//! from the store's constraint on the generated key, and callers draw a new
//! candidate when a commit loses the race (see
//! [`DocumentNumberAllocator::candidate`]).

use chrono::{DateTime, Utc};

use labstock_numbering::{DocumentKind, FiscalYear, NumberingScheme};

use crate::error::EngineError;
use crate::store::LedgerStore;

/// A formatted number plus the sequence it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocated {
    pub number: String,
    pub sequence: u64,
    pub fiscal_year: FiscalYear,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentNumberAllocator {
    scheme: NumberingScheme,
}

impl DocumentNumberAllocator {
    pub fn new(scheme: NumberingScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &NumberingScheme {
        &self.scheme
    }

    /// Highest sequence issued for `kind` in `fiscal_year`, 0 if none.
    /// Keys this scheme did not produce are skipped.
    pub fn high_water<S>(
        &self,
        store: &S,
        kind: DocumentKind,
        fiscal_year: FiscalYear,
    ) -> Result<u64, EngineError>
    where
        S: LedgerStore + ?Sized,
    {
        let issued = store.issued_numbers(kind)?;
        Ok(issued
            .iter()
            .filter_map(|number| self.scheme.parse(number).ok())
            .filter(|parsed| parsed.kind == kind && parsed.fiscal_year == fiscal_year)
            .map(|parsed| parsed.sequence)
            .max()
            .unwrap_or(0))
    }

    /// Next candidate number for a document created at `at`.
    ///
    /// `after` is the sequence of a candidate that already lost a race in
    /// this call; the new candidate is strictly greater than it, even if the
    /// rescan has not caught up with the winner yet.
    pub fn candidate<S>(
        &self,
        store: &S,
        kind: DocumentKind,
        at: DateTime<Utc>,
        after: Option<u64>,
    ) -> Result<Allocated, EngineError>
    where
        S: LedgerStore + ?Sized,
    {
        let fiscal_year = FiscalYear::containing(at.date_naive());
        let issued = self.high_water(store, kind, fiscal_year)?;

        let mut sequence = issued.saturating_add(1);
        if let Some(previous) = after {
            sequence = sequence.max(previous.saturating_add(1));
        }

        Ok(Allocated {
            number: self.scheme.format(kind, fiscal_year, sequence),
            sequence,
            fiscal_year,
        })
    }
}
