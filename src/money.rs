// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed two-digit monetary amounts.
//!
//! # Example
//!
//! ```
//! use expense_split::Money;
//! use rust_decimal_macros::dec;
//!
//! let total = Money::new(dec!(100)).unwrap();
//! assert_eq!(total.to_string(), "100.00");
//! assert!(Money::new(dec!(0.001)).is_err());
//! ```

use crate::error::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// A decimal amount with exactly two fraction digits.
///
/// Wraps a [`Decimal`] that is always rescaled to [`Money::SCALE`]. Values
/// carrying more significant fraction digits are rejected rather than
/// rounded, so the only place rounding happens is the split engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fraction digits (one minor unit is `0.01`).
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest storable magnitude: ten significant digits, two of them
    /// fractional.
    pub const MAX: Money = Money(dec!(99999999.99));

    /// Creates an amount, rejecting values with more than two significant
    /// fraction digits or a magnitude above [`Money::MAX`].
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value.normalize().scale() > Self::SCALE {
            return Err(ValidationError::ExcessPrecision(value));
        }
        if value.abs() > Self::MAX.0 {
            return Err(ValidationError::OutOfRange {
                value,
                max: Self::MAX.0,
            });
        }
        let mut value = value;
        value.rescale(Self::SCALE);
        Ok(Money(value))
    }

    /// Creates an amount from a count of minor units (cents).
    pub fn from_minor_units(units: i64) -> Self {
        Money(Decimal::new(units, Self::SCALE))
    }

    /// Rounds an arbitrary decimal to two digits using banker's rounding.
    pub(crate) fn round(value: Decimal) -> Self {
        let mut rounded =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointNearestEven);
        rounded.rescale(Self::SCALE);
        Money(rounded)
    }

    /// The smallest representable non-zero amount, `0.01`.
    pub fn minor_unit() -> Self {
        Self::from_minor_units(1)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Amount expressed as a whole number of minor units.
    pub fn minor_units(&self) -> i128 {
        let mut value = self.0;
        value.rescale(Self::SCALE);
        value.mantissa()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_rescales_to_two_digits() {
        let money = Money::new(dec!(100)).unwrap();
        assert_eq!(money.as_decimal().scale(), 2);
        assert_eq!(money.to_string(), "100.00");
    }

    #[test]
    fn new_accepts_trailing_zeros_beyond_scale() {
        let money = Money::new(dec!(1.500)).unwrap();
        assert_eq!(money, Money::from_minor_units(150));
    }

    #[test]
    fn new_rejects_excess_precision() {
        assert_eq!(
            Money::new(dec!(0.005)),
            Err(ValidationError::ExcessPrecision(dec!(0.005)))
        );
    }

    #[test]
    fn new_rejects_amounts_above_max() {
        assert_eq!(Money::new(dec!(99999999.99)), Ok(Money::MAX));
        assert_eq!(
            Money::new(dec!(100000000)),
            Err(ValidationError::OutOfRange {
                value: dec!(100000000),
                max: dec!(99999999.99),
            })
        );
        assert!(matches!(
            Money::new(Decimal::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            Money::new(-Decimal::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn max_keeps_two_digit_scale() {
        assert_eq!(Money::MAX.as_decimal().scale(), 2);
        assert_eq!(Money::MAX.to_string(), "99999999.99");
    }

    #[test]
    fn checked_add_reports_overflow() {
        let big = Money(Decimal::MAX);
        assert_eq!(big.checked_add(Money::minor_unit()), None);
        assert_eq!(
            Money::from_minor_units(1).checked_add(Money::from_minor_units(2)),
            Some(Money::from_minor_units(3))
        );
    }

    #[test]
    fn round_uses_bankers_rounding() {
        // Midpoints round to the even neighbour.
        assert_eq!(Money::round(dec!(0.125)), Money::from_minor_units(12));
        assert_eq!(Money::round(dec!(0.135)), Money::from_minor_units(14));
        assert_eq!(Money::round(dec!(3.3333333)), Money::from_minor_units(333));
    }

    #[test]
    fn minor_units_counts_cents() {
        assert_eq!(Money::new(dec!(12.34)).unwrap().minor_units(), 1234);
        assert_eq!(Money::from_minor_units(-1).minor_units(), -1);
        assert_eq!(Money::ZERO.minor_units(), 0);
    }

    #[test]
    fn sum_stays_in_decimal_domain() {
        let parts = [dec!(0.10), dec!(0.20), dec!(0.30)].map(|d| Money::new(d).unwrap());
        let total: Money = parts.iter().sum();
        assert_eq!(total, Money::new(dec!(0.60)).unwrap());
    }

    #[test]
    fn serializes_as_two_digit_string() {
        let money = Money::new(dec!(7.5)).unwrap();
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"7.50\"");
    }

    #[test]
    fn deserialize_rejects_excess_precision() {
        let parsed: Result<Money, _> = serde_json::from_str("\"1.234\"");
        assert!(parsed.is_err());

        let parsed: Money = serde_json::from_str("\"60.00\"").unwrap();
        assert_eq!(parsed, Money::from_minor_units(6000));
    }
}
