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

//! # Expense Split
//!
//! This library records shared expenses and splits their cost among
//! participants using one of three strategies: equal shares, exact amounts or
//! percentages.
//!
//! ## Core Components
//!
//! - [`SplitEngine`]: Pure split computation and validation
//! - [`Money`]: Two-digit decimal amounts, never floating point
//! - [`Ledger`]: Concurrent in-memory store of users and expenses
//! - [`authorize`]: The single authorization policy every operation goes through
//! - [`write_balance_sheet`]: CSV export of the whole ledger
//! - [`ValidationError`]: Reasons a split is rejected
//!
//! ## Example
//!
//! ```
//! use expense_split::{Money, ParticipantInput, SplitEngine, SplitStrategy, UserId};
//! use rust_decimal_macros::dec;
//!
//! let engine = SplitEngine::new();
//!
//! let allocations = engine
//!     .compute(
//!         Money::new(dec!(100.00)).unwrap(),
//!         SplitStrategy::Exact,
//!         &[
//!             ParticipantInput::exact(UserId(1), Money::new(dec!(60.00)).unwrap()),
//!             ParticipantInput::exact(UserId(2), Money::new(dec!(40.00)).unwrap()),
//!         ],
//!     )
//!     .unwrap();
//!
//! assert_eq!(allocations[0].amount, Money::new(dec!(60.00)).unwrap());
//! assert_eq!(allocations[1].amount, Money::new(dec!(40.00)).unwrap());
//! ```
//!
//! ## Thread Safety
//!
//! The engine is stateless. The ledger keeps expenses in a [`dashmap::DashMap`]
//! and users behind a [`parking_lot::RwLock`], so it can be shared behind an
//! `Arc` by any number of request handlers.

#[cfg(feature = "server")]
pub mod api;
mod base;
mod engine;
pub mod error;
pub mod export;
pub mod ledger;
mod money;
pub mod policy;
mod split;

pub use base::{ExpenseId, UserId};
pub use engine::{MAX_PERCENTAGE, SplitEngine};
pub use error::{ExportError, LedgerError, ValidationError};
pub use export::write_balance_sheet;
pub use ledger::{Expense, Ledger, NewExpense, User};
pub use money::Money;
pub use policy::{Action, Caller, authorize};
pub use split::{ParticipantAllocation, ParticipantInput, RemainderPolicy, SplitStrategy};
