//! Fixed-point money amounts.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Non-negative amount in the smallest currency unit (cents).
///
/// On the wire an amount is a plain decimal number (`10.0`, `2.5`); inside the
/// domain it stays integral so totals never drift.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "f64", try_from = "f64")]
pub struct Money {
    cents: u64,
}

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    /// Parse a decimal amount, rounding to the nearest cent.
    pub fn from_decimal(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation("amount must be a finite number"));
        }
        if value < 0.0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return Err(DomainError::validation("amount is out of range"));
        }
        Ok(Self {
            cents: cents as u64,
        })
    }

    pub fn to_decimal(self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Multiply by a quantity, `None` on overflow.
    pub fn checked_mul(self, quantity: u64) -> Option<Self> {
        self.cents.checked_mul(quantity).map(Self::from_cents)
    }

    pub fn checked_add(self, other: Money) -> Option<Self> {
        self.cents.checked_add(other.cents).map(Self::from_cents)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl From<Money> for f64 {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl TryFrom<f64> for Money {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Money::from_decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimals_to_cents() {
        assert_eq!(Money::from_decimal(10.0).unwrap().cents(), 1000);
        assert_eq!(Money::from_decimal(2.5).unwrap().cents(), 250);
        assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap().cents(), 30);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(Money::from_decimal(-0.01).is_err());
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert!(Money::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_cents(1000).to_string(), "10.00");
        assert_eq!(Money::from_cents(705).to_string(), "7.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn serializes_as_decimal_number() {
        let json = serde_json::to_string(&Money::from_cents(750)).unwrap();
        assert_eq!(json, "7.5");
        let back: Money = serde_json::from_str("4.0").unwrap();
        assert_eq!(back, Money::from_cents(400));
        assert!(serde_json::from_str::<Money>("-1.0").is_err());
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(
            Money::from_cents(250).checked_add(Money::from_cents(120)),
            Some(Money::from_cents(370))
        );
        assert_eq!(Money::from_cents(u64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn checked_mul_detects_overflow() {
        assert_eq!(Money::from_cents(250).checked_mul(3), Some(Money::from_cents(750)));
        assert_eq!(Money::from_cents(u64::MAX).checked_mul(2), None);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: whole-cent amounts survive the decimal round trip.
            #[test]
            fn decimal_round_trip_is_exact(cents in 0u64..10_000_000_000) {
                let money = Money::from_cents(cents);
                prop_assert_eq!(Money::from_decimal(money.to_decimal()).unwrap(), money);
            }
        }
    }
}
