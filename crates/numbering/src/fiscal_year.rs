use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult, ValueObject};

/// Month in which a fiscal year starts (April).
pub const FISCAL_START_MONTH: u32 = 4;

/// April 1 to March 31 accounting period, identified by its starting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalYear {
    start_year: i32,
}

impl ValueObject for FiscalYear {}

impl FiscalYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= FISCAL_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn start_date(&self) -> DomainResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, FISCAL_START_MONTH, 1)
            .ok_or_else(|| DomainError::invalid(format!("fiscal year {} out of range", self.start_year)))
    }

    /// `"{year}-{(year + 1) mod 100}"`, e.g. `2025-26`.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
    }

    pub fn parse_label(label: &str) -> DomainResult<Self> {
        let invalid = || DomainError::invalid(format!("invalid fiscal year '{label}'"));
        let (start, end) = label.split_once('-').ok_or_else(invalid)?;
        if end.len() != 2 {
            return Err(invalid());
        }
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let fy = Self::new(start_year);
        if fy.label() != label {
            return Err(invalid());
        }
        Ok(fy)
    }
}

impl core::fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn march_31_and_april_1_are_different_years() {
        let march = FiscalYear::containing(date(2025, 3, 31));
        let april = FiscalYear::containing(date(2025, 4, 1));
        assert_eq!(march.label(), "2024-25");
        assert_eq!(april.label(), "2025-26");
        assert_ne!(march, april);
    }

    #[test]
    fn century_rollover_label() {
        assert_eq!(FiscalYear::new(2099).label(), "2099-00");
    }

    #[test]
    fn bounds() {
        let fy = FiscalYear::new(2024);
        assert_eq!(fy.start_date().unwrap(), date(2024, 4, 1));
        assert_eq!(FiscalYear::containing(date(2025, 3, 31)), fy);
        assert_eq!(FiscalYear::containing(date(2025, 4, 1)), FiscalYear::new(2025));
    }

    #[test]
    fn parse_label_round_trip_and_rejects_mismatched_pair() {
        assert_eq!(FiscalYear::parse_label("2025-26").unwrap(), FiscalYear::new(2025));
        assert!(FiscalYear::parse_label("2025-27").is_err());
        assert!(FiscalYear::parse_label("2025").is_err());
    }

    proptest! {
        #[test]
        fn every_date_lies_within_its_fiscal_year(days in 0i64..40_000) {
            let d = date(1990, 1, 1) + chrono::Duration::days(days);
            let fy = FiscalYear::containing(d);
            prop_assert!(fy.start_date().unwrap() <= d);
            let next = FiscalYear::new(fy.start_year() + 1);
            prop_assert!(d < next.start_date().unwrap());
        }
    }
}
