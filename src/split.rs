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

//! Split strategies and the participant records flowing in and out of the
//! [`SplitEngine`](crate::SplitEngine).

use crate::base::UserId;
use crate::error::ValidationError;
use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an expense total is divided among its participants.
///
/// Chosen once when the expense is recorded. On the wire the strategy is
/// tagged `EQUAL`, `EXACT` or `PERCENTAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitStrategy {
    Equal,
    Exact,
    Percentage,
}

impl SplitStrategy {
    /// Wire tag, as accepted by [`FromStr`].
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Exact => "EXACT",
            Self::Percentage => "PERCENTAGE",
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(Self::Equal),
            "EXACT" => Ok(Self::Exact),
            "PERCENTAGE" => Ok(Self::Percentage),
            _ => Err(ValidationError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Human-readable name, used in the balance sheet.
impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "Equal",
            Self::Exact => "Exact",
            Self::Percentage => "Percentage",
        };
        f.write_str(name)
    }
}

/// One participant's raw share, as supplied by the caller.
///
/// `amount` is only read by [`SplitStrategy::Exact`] and `percentage` only by
/// [`SplitStrategy::Percentage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInput {
    pub user: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
}

impl ParticipantInput {
    /// Participant of an equal split.
    pub fn equal(user: UserId) -> Self {
        Self {
            user,
            amount: None,
            percentage: None,
        }
    }

    /// Participant of an exact split.
    pub fn exact(user: UserId, amount: Money) -> Self {
        Self {
            user,
            amount: Some(amount),
            percentage: None,
        }
    }

    /// Participant of a percentage split.
    pub fn percentage(user: UserId, percentage: Decimal) -> Self {
        Self {
            user,
            amount: None,
            percentage: Some(percentage),
        }
    }
}

/// The amount assigned to one participant of one expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantAllocation {
    pub user: UserId,
    pub amount: Money,
    /// Set for percentage splits only.
    pub percentage: Option<Decimal>,
}

/// What to do with minor units lost when shares are rounded to two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Keep every rounded share as is. Allocations may miss the total by a
    /// few cents (`10.00 / 3` gives `3.33` three times).
    #[default]
    Preserve,
    /// Hand the leftover cents out one at a time so allocations always sum
    /// to the total. Participants whose share was rounded the furthest go
    /// first, ties in input order.
    Distribute,
}
