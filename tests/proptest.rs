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

//! Property-based tests for the split engine.
//!
//! These tests verify invariants that should hold for any total and any
//! set of participant shares.

use expense_split::{
    Money, ParticipantInput, RemainderPolicy, SplitEngine, SplitStrategy, UserId, ValidationError,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (0.01 to 100000.00).
fn arb_total() -> impl Strategy<Value = Money> {
    (1i64..=10_000_000i64).prop_map(Money::from_minor_units)
}

/// Split a total into `n` random exact amounts that add up to it.
fn arb_exact_split() -> impl Strategy<Value = (Money, Vec<Money>)> {
    prop::collection::vec(0i64..=1_000_000i64, 1..12).prop_map(|cents| {
        let amounts: Vec<Money> = cents.into_iter().map(Money::from_minor_units).collect();
        let total: Money = amounts.iter().sum();
        // Keep the total strictly positive.
        let mut amounts = amounts;
        amounts[0] = amounts[0] + Money::minor_unit();
        (total + Money::minor_unit(), amounts)
    })
}

/// Random percentages (two decimals) adding up to exactly 100.
fn arb_percentages() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(1u32..=1_000u32, 1..10).prop_map(|weights| {
        let sum: u32 = weights.iter().sum();
        // Basis points, last participant takes what is left.
        let mut basis_points: Vec<i64> = weights
            .iter()
            .map(|w| (*w as i64 * 10_000) / sum as i64)
            .collect();
        let assigned: i64 = basis_points.iter().sum();
        if let Some(last) = basis_points.last_mut() {
            *last += 10_000 - assigned;
        }
        basis_points
            .into_iter()
            .map(|bp| Decimal::new(bp, 2))
            .collect()
    })
}

fn participants_equal(n: usize) -> Vec<ParticipantInput> {
    (1..=n as u32)
        .map(|id| ParticipantInput::equal(UserId(id)))
        .collect()
}

fn participants_percentage(percentages: &[Decimal]) -> Vec<ParticipantInput> {
    percentages
        .iter()
        .enumerate()
        .map(|(i, p)| ParticipantInput::percentage(UserId(i as u32 + 1), *p))
        .collect()
}

// =============================================================================
// Exact
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Valid exact splits return the supplied amounts in input order.
    #[test]
    fn exact_passes_amounts_through((total, amounts) in arb_exact_split()) {
        let participants: Vec<ParticipantInput> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| ParticipantInput::exact(UserId(i as u32 + 1), *a))
            .collect();

        let allocations = SplitEngine::new()
            .compute(total, SplitStrategy::Exact, &participants)
            .unwrap();

        prop_assert_eq!(allocations.len(), amounts.len());
        for (i, allocation) in allocations.iter().enumerate() {
            prop_assert_eq!(allocation.user, UserId(i as u32 + 1));
            prop_assert_eq!(allocation.amount, amounts[i]);
        }
    }

    /// Any nonzero difference between sum and total is rejected.
    #[test]
    fn exact_mismatch_is_rejected(
        (total, amounts) in arb_exact_split(),
        delta in prop_oneof![-1000i64..=-1, 1i64..=1000],
    ) {
        let shifted = total + Money::from_minor_units(delta);
        prop_assume!(shifted.is_positive());
        let participants: Vec<ParticipantInput> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| ParticipantInput::exact(UserId(i as u32 + 1), *a))
            .collect();

        let result = SplitEngine::new().compute(shifted, SplitStrategy::Exact, &participants);

        prop_assert_eq!(
            result,
            Err(ValidationError::AmountMismatch { expected: shifted, actual: total })
        );
    }
}

// =============================================================================
// Percentage
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Each allocation is total * percentage / 100 rounded to cents, carrying the percentage.
    #[test]
    fn percentage_allocations_match_formula(total in arb_total(), percentages in arb_percentages()) {
        let participants = participants_percentage(&percentages);
        let allocations = SplitEngine::new()
            .compute(total, SplitStrategy::Percentage, &participants)
            .unwrap();

        for (allocation, percentage) in allocations.iter().zip(&percentages) {
            let expected = (total.as_decimal() * percentage / Decimal::ONE_HUNDRED).round_dp(2);
            prop_assert_eq!(allocation.amount.as_decimal(), expected);
            prop_assert_eq!(allocation.percentage, Some(*percentage));
        }
    }

    /// Percentages not summing to 100 are rejected.
    #[test]
    fn percentage_mismatch_is_rejected(
        total in arb_total(),
        percentages in arb_percentages(),
        delta in prop_oneof![-500i64..=-1, 1i64..=500],
    ) {
        let mut percentages = percentages;
        percentages[0] += Decimal::new(delta, 2);
        prop_assume!(percentages[0] >= Decimal::ZERO);

        let result = SplitEngine::new().compute(
            total,
            SplitStrategy::Percentage,
            &participants_percentage(&percentages),
        );

        let is_mismatch = matches!(result, Err(ValidationError::PercentageMismatch { .. }));
        prop_assert!(is_mismatch);
    }

    /// With distribution on, percentage allocations always sum to the total.
    #[test]
    fn distributed_percentage_sums_to_total(total in arb_total(), percentages in arb_percentages()) {
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let allocations = engine
            .compute(total, SplitStrategy::Percentage, &participants_percentage(&percentages))
            .unwrap();

        let sum: Money = allocations.iter().map(|a| a.amount).sum();
        prop_assert_eq!(sum, total);
        prop_assert!(allocations.iter().all(|a| !a.amount.is_negative()));
    }
}

// =============================================================================
// Equal
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Evenly divisible totals split into identical shares summing to the total.
    #[test]
    fn divisible_equal_split_is_exact(share in 1i64..=1_000_000i64, n in 1usize..=20) {
        let total = Money::from_minor_units(share * n as i64);
        let allocations = SplitEngine::new()
            .compute(total, SplitStrategy::Equal, &participants_equal(n))
            .unwrap();

        prop_assert_eq!(allocations.len(), n);
        prop_assert!(allocations.iter().all(|a| a.amount == Money::from_minor_units(share)));
        let sum: Money = allocations.iter().map(|a| a.amount).sum();
        prop_assert_eq!(sum, total);
    }

    /// Without distribution, equal splits miss the total by at most n/2 cents.
    #[test]
    fn preserved_equal_remainder_is_bounded(total in arb_total(), n in 1usize..=20) {
        let allocations = SplitEngine::new()
            .compute(total, SplitStrategy::Equal, &participants_equal(n))
            .unwrap();

        let sum: Money = allocations.iter().map(|a| a.amount).sum();
        let residual = (total - sum).minor_units().abs();
        prop_assert!(residual <= (n as i128 + 1) / 2);
    }

    /// With distribution on, shares differ by at most one cent and sum to the total.
    #[test]
    fn distributed_equal_split_is_fair(total in arb_total(), n in 1usize..=20) {
        let engine = SplitEngine::with_remainder_policy(RemainderPolicy::Distribute);
        let allocations = engine
            .compute(total, SplitStrategy::Equal, &participants_equal(n))
            .unwrap();

        let sum: Money = allocations.iter().map(|a| a.amount).sum();
        prop_assert_eq!(sum, total);

        let max = allocations.iter().map(|a| a.amount).max().unwrap();
        let min = allocations.iter().map(|a| a.amount).min().unwrap();
        prop_assert!((max - min).minor_units() <= 1);
    }

    /// No strategy accepts an empty participant list.
    #[test]
    fn empty_participants_always_fail(total in arb_total()) {
        for strategy in [SplitStrategy::Equal, SplitStrategy::Exact, SplitStrategy::Percentage] {
            prop_assert_eq!(
                SplitEngine::new().compute(total, strategy, &[]),
                Err(ValidationError::EmptyParticipantSet)
            );
        }
    }
}
