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

//! In-memory expense ledger.
//!
//! The [`Ledger`] plays the persistence collaborator around the
//! [`SplitEngine`]: it keeps the registered users and every accepted
//! [`Expense`] together with its allocations, and routes each operation
//! through [`authorize`].
//!
//! # Example
//!
//! ```
//! use expense_split::{Ledger, Money, NewExpense, ParticipantInput, SplitStrategy};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//! let alice = ledger.register_user("alice", false).unwrap();
//! let bob = ledger.register_user("bob", false).unwrap();
//! let caller = ledger.caller(alice.id).unwrap();
//!
//! let expense = ledger
//!     .create_expense(
//!         &caller,
//!         NewExpense {
//!             title: "Dinner".to_string(),
//!             amount: Money::new(dec!(100.00)).unwrap(),
//!             split_type: SplitStrategy::Equal,
//!             splits: vec![
//!                 ParticipantInput::equal(alice.id),
//!                 ParticipantInput::equal(bob.id),
//!             ],
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(expense.splits[1].amount, Money::new(dec!(50.00)).unwrap());
//! ```
//!
//! # Consistency
//!
//! An expense and its allocations are stored as a single [`DashMap`] entry.
//! Creating, replacing or deleting one is therefore all-or-nothing: no
//! reader ever sees an expense with only part of its splits.

use crate::base::{ExpenseId, UserId};
use crate::engine::SplitEngine;
use crate::error::LedgerError;
use crate::money::Money;
use crate::policy::{Action, Caller, authorize};
use crate::split::{ParticipantAllocation, ParticipantInput, SplitStrategy};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// Trims `title` and checks it is non-blank and at most [`MAX_TITLE_LEN`]
/// characters long.
pub fn normalize_title(title: &str) -> Result<&str, LedgerError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(LedgerError::InvalidTitle);
    }
    Ok(title)
}

/// Minimal identity record: enough to resolve callers and print usernames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

/// Caller-supplied data for creating or replacing an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: Money,
    pub split_type: SplitStrategy,
    pub splits: Vec<ParticipantInput>,
}

/// A recorded expense with its computed allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub title: String,
    pub amount: Money,
    pub split_type: SplitStrategy,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// One allocation per participant, in the order they were supplied.
    pub splits: Vec<ParticipantAllocation>,
}

impl Expense {
    /// Sum of all allocations.
    pub fn allocated(&self) -> Money {
        self.splits.iter().map(|split| split.amount).sum()
    }
}

/// Users indexed by id and by username.
#[derive(Debug, Default)]
struct Directory {
    users: HashMap<UserId, User>,
    by_name: HashMap<String, UserId>,
    last_id: u32,
}

/// Concurrent store of users and expenses.
///
/// Lock order: an expense entry may be held while the user directory is
/// read, never the other way round.
#[derive(Debug)]
pub struct Ledger {
    engine: SplitEngine,
    users: RwLock<Directory>,
    expenses: DashMap<ExpenseId, Expense>,
    next_expense_id: AtomicU32,
}

impl Ledger {
    /// Creates an empty ledger using the default [`SplitEngine`].
    pub fn new() -> Self {
        Self::with_engine(SplitEngine::new())
    }

    pub fn with_engine(engine: SplitEngine) -> Self {
        Ledger {
            engine,
            users: RwLock::new(Directory::default()),
            expenses: DashMap::new(),
            next_expense_id: AtomicU32::new(1),
        }
    }

    pub fn engine(&self) -> &SplitEngine {
        &self.engine
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidUsername`] - Username is blank.
    /// - [`LedgerError::DuplicateUsername`] - Username is already taken.
    pub fn register_user(&self, username: &str, is_admin: bool) -> Result<User, LedgerError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::InvalidUsername);
        }

        let mut directory = self.users.write();
        if directory.by_name.contains_key(username) {
            return Err(LedgerError::DuplicateUsername(username.to_string()));
        }

        directory.last_id += 1;
        let user = User {
            id: UserId(directory.last_id),
            username: username.to_string(),
            is_admin,
        };
        directory.by_name.insert(user.username.clone(), user.id);
        directory.users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, username = %user.username, is_admin, "user registered");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.read().users.get(&id).cloned()
    }

    pub fn user_by_name(&self, username: &str) -> Option<User> {
        let directory = self.users.read();
        directory
            .by_name
            .get(username)
            .and_then(|id| directory.users.get(id))
            .cloned()
    }

    /// Resolves a user id into a [`Caller`], elevated when the user is an admin.
    pub fn caller(&self, id: UserId) -> Result<Caller, LedgerError> {
        self.user(id)
            .map(|user| Caller {
                user_id: user.id,
                elevated: user.is_admin,
            })
            .ok_or(LedgerError::UnknownUser(id))
    }

    /// Validates, splits and stores a new expense owned by `caller`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidTitle`] - Title is blank or too long.
    /// - [`LedgerError::UnknownUser`] - A participant is not registered.
    /// - [`LedgerError::Validation`] - The split engine rejected the shares.
    pub fn create_expense(&self, caller: &Caller, new: NewExpense) -> Result<Expense, LedgerError> {
        authorize(caller, Action::CreateExpense, None)?;
        let (title, splits) = self.prepare(&new).inspect_err(|err| {
            tracing::warn!(created_by = %caller.user_id, %err, "expense rejected");
        })?;

        let id = ExpenseId(self.next_expense_id.fetch_add(1, Ordering::Relaxed));
        let expense = Expense {
            id,
            title,
            amount: new.amount,
            split_type: new.split_type,
            created_by: caller.user_id,
            created_at: Utc::now(),
            splits,
        };
        self.expenses.insert(id, expense.clone());

        tracing::info!(
            expense_id = %id,
            created_by = %caller.user_id,
            amount = %expense.amount,
            split_type = %expense.split_type,
            participants = expense.splits.len(),
            "expense recorded"
        );
        Ok(expense)
    }

    /// Returns one expense, if the caller may view it.
    pub fn expense(&self, caller: &Caller, id: ExpenseId) -> Result<Expense, LedgerError> {
        let expense = self
            .expenses
            .get(&id)
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        authorize(caller, Action::ViewExpense, Some(expense.created_by))?;
        Ok(expense.value().clone())
    }

    /// Replaces an expense's title, amount, strategy and every split.
    ///
    /// The creator and creation time are kept. Splits are never edited one
    /// by one: the whole set is recomputed and swapped in.
    pub fn update_expense(
        &self,
        caller: &Caller,
        id: ExpenseId,
        new: NewExpense,
    ) -> Result<Expense, LedgerError> {
        let mut entry = self
            .expenses
            .get_mut(&id)
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        authorize(caller, Action::UpdateExpense, Some(entry.created_by))?;
        let (title, splits) = self.prepare(&new).inspect_err(|err| {
            tracing::warn!(expense_id = %id, %err, "expense update rejected");
        })?;

        entry.title = title;
        entry.amount = new.amount;
        entry.split_type = new.split_type;
        entry.splits = splits;

        tracing::info!(expense_id = %id, updated_by = %caller.user_id, "expense replaced");
        Ok(entry.value().clone())
    }

    pub fn delete_expense(&self, caller: &Caller, id: ExpenseId) -> Result<(), LedgerError> {
        let owner = self
            .expenses
            .get(&id)
            .map(|expense| expense.created_by)
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        authorize(caller, Action::DeleteExpense, Some(owner))?;

        self.expenses
            .remove(&id)
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        tracing::info!(expense_id = %id, deleted_by = %caller.user_id, "expense deleted");
        Ok(())
    }

    /// Expenses created by the caller, ordered by id.
    pub fn expenses_created_by(&self, caller: &Caller) -> Result<Vec<Expense>, LedgerError> {
        authorize(caller, Action::ListOwnExpenses, None)?;
        Ok(self.collect(|expense| expense.created_by == caller.user_id))
    }

    /// Every expense in the ledger, ordered by id. Admin only.
    pub fn all_expenses(&self, caller: &Caller) -> Result<Vec<Expense>, LedgerError> {
        authorize(caller, Action::ListAllExpenses, None)?;
        Ok(self.collect(|_| true))
    }

    /// Every expense, ordered by id, without an authorization check. Callers
    /// must have authorized their own action first.
    pub(crate) fn snapshot(&self) -> Vec<Expense> {
        self.collect(|_| true)
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    fn collect(&self, filter: impl Fn(&Expense) -> bool) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        expenses.sort_by_key(|expense| expense.id);
        expenses
    }

    /// Checks title and participants, then runs the split engine.
    fn prepare(
        &self,
        new: &NewExpense,
    ) -> Result<(String, Vec<ParticipantAllocation>), LedgerError> {
        let title = normalize_title(&new.title)?;

        {
            let directory = self.users.read();
            if let Some(unknown) = new
                .splits
                .iter()
                .find(|split| !directory.users.contains_key(&split.user))
            {
                return Err(LedgerError::UnknownUser(unknown.user));
            }
        }

        let splits = self
            .engine
            .compute(new.amount, new.split_type, &new.splits)?;
        Ok((title.to_string(), splits))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
