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

//! Split computation engine.
//!
//! The [`SplitEngine`] turns an expense total, a [`SplitStrategy`] and the
//! participants' raw shares into one [`ParticipantAllocation`] per
//! participant, or rejects the input with a [`ValidationError`].
//!
//! # Strategies
//!
//! - **Equal**: every participant gets `total / n`, rounded to two digits.
//! - **Exact**: every participant states an amount, and the amounts must add
//!   up to the total exactly.
//! - **Percentage**: every participant states a percentage. Percentages must
//!   add up to exactly 100, and each share is `total * percentage / 100`
//!   rounded to two digits.
//!
//! # Example
//!
//! ```
//! use expense_split::{Money, ParticipantInput, SplitEngine, SplitStrategy, UserId};
//! use rust_decimal_macros::dec;
//!
//! let engine = SplitEngine::new();
//! let total = Money::new(dec!(100.00)).unwrap();
//! let participants = [
//!     ParticipantInput::percentage(UserId(1), dec!(70)),
//!     ParticipantInput::percentage(UserId(2), dec!(30)),
//! ];
//!
//! let allocations = engine
//!     .compute(total, SplitStrategy::Percentage, &participants)
//!     .unwrap();
//! assert_eq!(allocations[0].amount, Money::new(dec!(70.00)).unwrap());
//! assert_eq!(allocations[1].percentage, Some(dec!(30)));
//! ```
//!
//! # Thread Safety
//!
//! The engine holds no state besides its [`RemainderPolicy`] and performs no
//! I/O, so a single instance can be shared freely across threads.

use crate::base::UserId;
use crate::error::ValidationError;
use crate::money::Money;
use crate::split::{ParticipantAllocation, ParticipantInput, RemainderPolicy, SplitStrategy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

/// Largest accepted percentage: five significant digits, two of them
/// fractional.
pub const MAX_PERCENTAGE: Decimal = dec!(999.99);

/// Validates participant shares and derives per-participant allocations.
///
/// # Invariants
///
/// - On success exactly one allocation is returned per participant, in input
///   order.
/// - `Exact` allocations always sum to the total.
/// - With [`RemainderPolicy::Distribute`], `Equal` and `Percentage`
///   allocations also sum to the total. With [`RemainderPolicy::Preserve`]
///   they may miss it by a few minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitEngine {
    remainder: RemainderPolicy,
}

impl SplitEngine {
    /// Creates an engine that keeps rounded shares as they are.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remainder_policy(remainder: RemainderPolicy) -> Self {
        Self { remainder }
    }

    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder
    }

    /// Computes the allocations for one expense.
    ///
    /// Either every allocation is returned or none is.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyParticipantSet`] - No participants.
    /// - [`ValidationError::NonPositiveTotal`] - Total is zero or negative.
    /// - [`ValidationError::DuplicateParticipant`] - A participant is listed twice.
    /// - [`ValidationError::MissingAmount`] / [`ValidationError::MissingPercentage`] -
    ///   A share required by the strategy is absent.
    /// - [`ValidationError::NegativeShare`] - A supplied share is negative.
    /// - [`ValidationError::ExcessPrecision`] - A percentage has more than two decimals.
    /// - [`ValidationError::OutOfRange`] - A percentage exceeds [`MAX_PERCENTAGE`],
    ///   or shares add up to more than a decimal can hold.
    /// - [`ValidationError::AmountMismatch`] - Exact amounts do not sum to the total.
    /// - [`ValidationError::PercentageMismatch`] - Percentages do not sum to 100.
    pub fn compute(
        &self,
        total: Money,
        strategy: SplitStrategy,
        participants: &[ParticipantInput],
    ) -> Result<Vec<ParticipantAllocation>, ValidationError> {
        if participants.is_empty() {
            return Err(ValidationError::EmptyParticipantSet);
        }
        if !total.is_positive() {
            return Err(ValidationError::NonPositiveTotal(total));
        }

        let mut seen = HashSet::with_capacity(participants.len());
        for participant in participants {
            if !seen.insert(participant.user) {
                return Err(ValidationError::DuplicateParticipant(participant.user));
            }
        }

        match strategy {
            SplitStrategy::Equal => Ok(self.split_equal(total, participants)),
            SplitStrategy::Exact => split_exact(total, participants),
            SplitStrategy::Percentage => self.split_percentage(total, participants),
        }
    }

    fn split_equal(
        &self,
        total: Money,
        participants: &[ParticipantInput],
    ) -> Vec<ParticipantAllocation> {
        let share = total.as_decimal() / Decimal::from(participants.len());
        let shares: Vec<(UserId, Decimal, Option<Decimal>)> = participants
            .iter()
            .map(|participant| (participant.user, share, None))
            .collect();

        self.allocate_rounded(total, &shares)
    }

    fn split_percentage(
        &self,
        total: Money,
        participants: &[ParticipantInput],
    ) -> Result<Vec<ParticipantAllocation>, ValidationError> {
        let mut percentages = Vec::with_capacity(participants.len());
        for participant in participants {
            let percentage = participant
                .percentage
                .ok_or(ValidationError::MissingPercentage(participant.user))?;
            if percentage < Decimal::ZERO {
                return Err(ValidationError::NegativeShare(participant.user));
            }
            if percentage.normalize().scale() > Money::SCALE {
                return Err(ValidationError::ExcessPrecision(percentage));
            }
            if percentage > MAX_PERCENTAGE {
                return Err(ValidationError::OutOfRange {
                    value: percentage,
                    max: MAX_PERCENTAGE,
                });
            }
            let mut percentage = percentage;
            percentage.rescale(Money::SCALE);
            percentages.push((participant.user, percentage));
        }

        let sum = percentages
            .iter()
            .try_fold(Decimal::ZERO, |sum, (_, percentage)| {
                sum.checked_add(*percentage)
            })
            .ok_or(ValidationError::OutOfRange {
                value: Decimal::MAX,
                max: MAX_PERCENTAGE,
            })?;
        if sum != Decimal::ONE_HUNDRED {
            return Err(ValidationError::PercentageMismatch {
                expected: Decimal::ONE_HUNDRED,
                actual: sum,
            });
        }

        let shares: Vec<(UserId, Decimal, Option<Decimal>)> = percentages
            .into_iter()
            .map(|(user, percentage)| {
                let share = percentage / Decimal::ONE_HUNDRED * total.as_decimal();
                (user, share, Some(percentage))
            })
            .collect();

        Ok(self.allocate_rounded(total, &shares))
    }

    /// Rounds unrounded shares to two digits, then applies the remainder policy.
    fn allocate_rounded(
        &self,
        total: Money,
        shares: &[(UserId, Decimal, Option<Decimal>)],
    ) -> Vec<ParticipantAllocation> {
        let mut allocations: Vec<ParticipantAllocation> = shares
            .iter()
            .map(|&(user, share, percentage)| ParticipantAllocation {
                user,
                amount: Money::round(share),
                percentage,
            })
            .collect();

        if self.remainder == RemainderPolicy::Distribute {
            let unrounded: Vec<Decimal> = shares.iter().map(|&(_, share, _)| share).collect();
            distribute_remainder(total, &unrounded, &mut allocations);
        }

        allocations
    }
}

fn split_exact(
    total: Money,
    participants: &[ParticipantInput],
) -> Result<Vec<ParticipantAllocation>, ValidationError> {
    let mut allocations = Vec::with_capacity(participants.len());
    for participant in participants {
        let amount = participant
            .amount
            .ok_or(ValidationError::MissingAmount(participant.user))?;
        if amount.is_negative() {
            return Err(ValidationError::NegativeShare(participant.user));
        }
        allocations.push(ParticipantAllocation {
            user: participant.user,
            amount,
            percentage: None,
        });
    }

    let sum = allocations
        .iter()
        .try_fold(Money::ZERO, |sum, allocation| sum.checked_add(allocation.amount))
        .ok_or(ValidationError::OutOfRange {
            value: Decimal::MAX,
            max: Money::MAX.as_decimal(),
        })?;
    if sum != total {
        return Err(ValidationError::AmountMismatch {
            expected: total,
            actual: sum,
        });
    }

    Ok(allocations)
}

/// Moves the rounding residual onto individual allocations one minor unit
/// at a time.
///
/// A positive residual goes to the participants who lost the most to
/// rounding, a negative one is taken from those who gained the most. The
/// sort is stable, so ties fall back to input order.
fn distribute_remainder(
    total: Money,
    unrounded: &[Decimal],
    allocations: &mut [ParticipantAllocation],
) {
    let allocated: Money = allocations.iter().map(|allocation| allocation.amount).sum();
    let residual = (total - allocated).minor_units();
    if residual == 0 {
        return;
    }

    let step = Money::from_minor_units(residual.signum() as i64);
    let mut order: Vec<usize> = (0..allocations.len()).collect();
    order.sort_by(|&a, &b| {
        let lost_a = unrounded[a] - allocations[a].amount.as_decimal();
        let lost_b = unrounded[b] - allocations[b].amount.as_decimal();
        if residual > 0 {
            lost_b.cmp(&lost_a)
        } else {
            lost_a.cmp(&lost_b)
        }
    });

    for &index in order.iter().cycle().take(residual.unsigned_abs() as usize) {
        allocations[index].amount = allocations[index].amount + step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(value: Decimal) -> Money {
        Money::new(value).unwrap()
    }

    fn amounts(allocations: &[ParticipantAllocation]) -> Vec<Money> {
        allocations.iter().map(|allocation| allocation.amount).collect()
    }

    #[test]
    fn equal_remainder_is_preserved_by_default() {
        let participants = [1, 2, 3].map(|id| ParticipantInput::equal(UserId(id)));
        let allocations = SplitEngine::new()
            .compute(money(dec!(10.00)), SplitStrategy::Equal, &participants)
            .unwrap();

        assert_eq!(amounts(&allocations), vec![money(dec!(3.33)); 3]);
    }

    #[test]
    fn equal_remainder_goes_to_first_participants_in_order() {
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let participants = [1, 2, 3].map(|id| ParticipantInput::equal(UserId(id)));
        let allocations = engine
            .compute(money(dec!(10.00)), SplitStrategy::Equal, &participants)
            .unwrap();

        assert_eq!(
            amounts(&allocations),
            vec![money(dec!(3.34)), money(dec!(3.33)), money(dec!(3.33))]
        );
    }

    #[test]
    fn equal_negative_remainder_is_taken_back() {
        // 0.05 / 3 = 0.01666..., each rounds up to 0.02 and the total overshoots by 0.01.
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let participants = [1, 2, 3].map(|id| ParticipantInput::equal(UserId(id)));
        let allocations = engine
            .compute(money(dec!(0.05)), SplitStrategy::Equal, &participants)
            .unwrap();

        assert_eq!(
            amounts(&allocations),
            vec![money(dec!(0.01)), money(dec!(0.02)), money(dec!(0.02))]
        );
    }

    #[test]
    fn percentage_remainder_favours_largest_rounding_loss() {
        // 33.33% + 33.33% + 33.34% of 0.10 = 0.03333 / 0.03333 / 0.03334,
        // all rounding to 0.03 and leaving one cent over.
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let participants = [
            ParticipantInput::percentage(UserId(1), dec!(33.33)),
            ParticipantInput::percentage(UserId(2), dec!(33.33)),
            ParticipantInput::percentage(UserId(3), dec!(33.34)),
        ];
        let allocations = engine
            .compute(money(dec!(0.10)), SplitStrategy::Percentage, &participants)
            .unwrap();

        assert_eq!(
            amounts(&allocations),
            vec![money(dec!(0.03)), money(dec!(0.03)), money(dec!(0.04))]
        );
    }

    #[test]
    fn distribute_leaves_exact_splits_untouched() {
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let participants = [
            ParticipantInput::exact(UserId(1), money(dec!(0.01))),
            ParticipantInput::exact(UserId(2), money(dec!(9.99))),
        ];
        let allocations = engine
            .compute(money(dec!(10.00)), SplitStrategy::Exact, &participants)
            .unwrap();

        assert_eq!(amounts(&allocations), vec![money(dec!(0.01)), money(dec!(9.99))]);
    }

    #[test]
    fn zero_percentage_participant_never_goes_negative() {
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let participants = [
            ParticipantInput::percentage(UserId(1), dec!(0)),
            ParticipantInput::percentage(UserId(2), dec!(66.67)),
            ParticipantInput::percentage(UserId(3), dec!(33.33)),
        ];
        let allocations = engine
            .compute(money(dec!(0.05)), SplitStrategy::Percentage, &participants)
            .unwrap();

        let sum: Money = amounts(&allocations).iter().sum();
        assert_eq!(sum, money(dec!(0.05)));
        assert!(allocations.iter().all(|allocation| !allocation.amount.is_negative()));
        assert_eq!(allocations[0].amount, Money::ZERO);
    }

    #[test]
    fn percentage_with_three_decimals_is_rejected() {
        let participants = [
            ParticipantInput::percentage(UserId(1), dec!(50.005)),
            ParticipantInput::percentage(UserId(2), dec!(49.995)),
        ];
        let result =
            SplitEngine::new().compute(money(dec!(10)), SplitStrategy::Percentage, &participants);

        assert_eq!(result, Err(ValidationError::ExcessPrecision(dec!(50.005))));
    }

    #[test]
    fn percentage_is_carried_with_two_digits() {
        let participants = [ParticipantInput::percentage(UserId(1), dec!(100))];
        let allocations = SplitEngine::new()
            .compute(money(dec!(12.00)), SplitStrategy::Percentage, &participants)
            .unwrap();

        assert_eq!(allocations[0].percentage.unwrap().to_string(), "100.00");
        assert_eq!(allocations[0].amount, money(dec!(12.00)));
    }
}
