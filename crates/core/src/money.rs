//! Exact, non-negative currency amounts.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Decimal places kept on averaged unit costs.
pub const COST_SCALE: u32 = 4;

/// Non-negative monetary amount (base-10, no float drift).
///
/// Serialized as a decimal string (e.g. `"150.00"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::invalid(format!(
                "amount cannot be negative (got {amount})"
            )));
        }
        Ok(Self(amount.normalize()))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invalid("amount overflow"))
    }

    /// `self * quantity`, exact.
    pub fn times(self, quantity: u64) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(|| DomainError::invalid("amount overflow"))
    }

    /// Quantity-weighted blend of two (quantity, unit cost) lots.
    ///
    /// Returns zero when the combined quantity is zero. The quotient is rounded
    /// to [`COST_SCALE`] places, midpoint away from zero.
    pub fn weighted_average(
        held_qty: u64,
        held_cost: Money,
        batch_qty: u64,
        batch_cost: Money,
    ) -> DomainResult<Money> {
        let total_qty = held_qty
            .checked_add(batch_qty)
            .ok_or_else(|| DomainError::invalid("quantity overflow"))?;
        if total_qty == 0 {
            return Ok(Money::ZERO);
        }

        let held_value = held_cost.times(held_qty)?;
        let batch_value = batch_cost.times(batch_qty)?;
        let total_value = held_value.checked_add(batch_value)?;

        let avg = total_value
            .0
            .checked_div(Decimal::from(total_qty))
            .ok_or_else(|| DomainError::invalid("amount overflow"))?
            .round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointAwayFromZero);

        Money::new(avg)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::invalid(format!("invalid amount '{s}': {e}")))?;
        Money::new(d)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            "-0.01".parse::<Money>(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn weighted_average_blends_lots() {
        let avg = Money::weighted_average(10, m("100"), 10, m("200")).unwrap();
        assert_eq!(avg, m("150"));
    }

    #[test]
    fn weighted_average_of_empty_lots_is_zero() {
        let avg = Money::weighted_average(0, m("99"), 0, m("10")).unwrap();
        assert_eq!(avg, Money::ZERO);
    }

    #[test]
    fn weighted_average_rounds_to_cost_scale() {
        // (1 * 1 + 2 * 0) / 3 = 0.3333...
        let avg = Money::weighted_average(1, m("1"), 2, m("0")).unwrap();
        assert_eq!(avg, m("0.3333"));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&m("12.50")).unwrap();
        assert_eq!(json, "\"12.5\"");
        let back: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(back, m("12.5"));
    }

    proptest! {
        /// The blended cost always lies between the two lot costs.
        #[test]
        fn weighted_average_is_bounded_by_inputs(
            q1 in 0u64..10_000,
            c1 in 0i64..1_000_000,
            q2 in 1u64..10_000,
            c2 in 0i64..1_000_000,
        ) {
            let a = Money::new(Decimal::new(c1, 2)).unwrap();
            let b = Money::new(Decimal::new(c2, 2)).unwrap();
            let avg = Money::weighted_average(q1, a, q2, b).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(avg >= lo && avg <= hi);
        }
    }
}
