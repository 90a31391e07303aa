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

//! Error types for split computation, ledger operations and export.

use crate::base::{ExpenseId, UserId};
use crate::money::Money;
use crate::policy::Action;
use rust_decimal::Decimal;
use thiserror::Error;

/// Split validation errors.
///
/// Every variant is detected before anything is stored and carries enough
/// detail (expected vs. actual) to build a precise client-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No participants were supplied
    #[error("at least one participant is required")]
    EmptyParticipantSet,

    /// Total is zero or negative
    #[error("invalid total amount {0} (must be positive)")]
    NonPositiveTotal(Money),

    /// The same participant appears more than once
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(UserId),

    /// Exact split without an amount for this participant
    #[error("missing amount for participant {0}")]
    MissingAmount(UserId),

    /// Percentage split without a percentage for this participant
    #[error("missing percentage for participant {0}")]
    MissingPercentage(UserId),

    /// Negative amount or percentage
    #[error("negative share for participant {0}")]
    NegativeShare(UserId),

    /// Value carries more than two fraction digits
    #[error("{0} has more than 2 decimal places")]
    ExcessPrecision(Decimal),

    /// Amount or percentage is larger than the ledger can store
    #[error("{value} exceeds the maximum of {max}")]
    OutOfRange { value: Decimal, max: Decimal },

    /// Exact amounts do not add up to the total
    #[error("sum of split amounts {actual} must equal the total expense amount {expected}")]
    AmountMismatch { expected: Money, actual: Money },

    /// Percentages do not add up to 100
    #[error("sum of percentages must be {expected}%, got {actual}%")]
    PercentageMismatch { expected: Decimal, actual: Decimal },

    /// Strategy tag is not EQUAL, EXACT or PERCENTAGE
    #[error("unknown split type '{0}'")]
    UnknownStrategy(String),
}

/// Ledger (persistence and authorization) errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Title is blank or longer than 100 characters
    #[error("title must be between 1 and 100 characters")]
    InvalidTitle,

    #[error("username must not be blank")]
    InvalidUsername,

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("user {0} not found")]
    UnknownUser(UserId),

    #[error("expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Caller is not allowed to perform the action
    #[error("not allowed to {action}")]
    Forbidden { action: Action },
}

/// Balance sheet export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to write balance sheet: {0}")]
    Csv(#[from] csv::Error),
}
