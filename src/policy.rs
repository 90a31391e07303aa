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

//! Authorization policy.
//!
//! Every ledger operation asks [`authorize`] before touching an expense. The
//! rules live in one place instead of being repeated per endpoint:
//!
//! | Action | Allowed for |
//! |--------|-------------|
//! | Create expense, list own expenses | any authenticated caller |
//! | View, update, delete expense | its creator, or an elevated caller |
//! | List all expenses, export balance sheet | elevated callers only |

use crate::base::UserId;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved, authenticated identity.
///
/// Produced by the identity collaborator. The core never sees credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    /// Admin callers may view and modify every expense.
    pub elevated: bool,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            elevated: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            elevated: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    CreateExpense,
    ViewExpense,
    UpdateExpense,
    DeleteExpense,
    ListOwnExpenses,
    ListAllExpenses,
    ExportBalanceSheet,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::CreateExpense => "create expenses",
            Self::ViewExpense => "view this expense",
            Self::UpdateExpense => "update this expense",
            Self::DeleteExpense => "delete this expense",
            Self::ListOwnExpenses => "list own expenses",
            Self::ListAllExpenses => "list all expenses",
            Self::ExportBalanceSheet => "export the balance sheet",
        };
        f.write_str(verb)
    }
}

/// Decides whether `caller` may perform `action` on a resource owned by
/// `owner` (`None` for collection-level actions).
///
/// # Errors
///
/// Returns [`LedgerError::Forbidden`] when the action is denied.
pub fn authorize(caller: &Caller, action: Action, owner: Option<UserId>) -> Result<(), LedgerError> {
    let allowed = match action {
        Action::CreateExpense | Action::ListOwnExpenses => true,
        Action::ViewExpense | Action::UpdateExpense | Action::DeleteExpense => {
            caller.elevated || owner == Some(caller.user_id)
        }
        Action::ListAllExpenses | Action::ExportBalanceSheet => caller.elevated,
    };

    if allowed {
        Ok(())
    } else {
        Err(LedgerError::Forbidden { action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: UserId = UserId(1);
    const OTHER: UserId = UserId(2);

    #[test]
    fn anyone_can_create_and_list_own() {
        let caller = Caller::user(OTHER);
        assert!(authorize(&caller, Action::CreateExpense, None).is_ok());
        assert!(authorize(&caller, Action::ListOwnExpenses, None).is_ok());
    }

    #[test]
    fn owner_can_modify_own_expense() {
        let caller = Caller::user(OWNER);
        for action in [Action::ViewExpense, Action::UpdateExpense, Action::DeleteExpense] {
            assert!(authorize(&caller, action, Some(OWNER)).is_ok());
        }
    }

    #[test]
    fn others_cannot_touch_foreign_expense() {
        let caller = Caller::user(OTHER);
        for action in [Action::ViewExpense, Action::UpdateExpense, Action::DeleteExpense] {
            assert_eq!(
                authorize(&caller, action, Some(OWNER)),
                Err(LedgerError::Forbidden { action })
            );
        }
    }

    #[test]
    fn missing_owner_denies_ordinary_caller() {
        let caller = Caller::user(OWNER);
        assert!(authorize(&caller, Action::ViewExpense, None).is_err());
    }

    #[test]
    fn admin_can_do_everything() {
        let admin = Caller::admin(UserId(99));
        for action in [
            Action::CreateExpense,
            Action::ViewExpense,
            Action::UpdateExpense,
            Action::DeleteExpense,
            Action::ListOwnExpenses,
            Action::ListAllExpenses,
            Action::ExportBalanceSheet,
        ] {
            assert!(authorize(&admin, action, Some(OWNER)).is_ok());
        }
    }

    #[test]
    fn collection_actions_require_elevation() {
        let caller = Caller::user(OWNER);
        assert!(authorize(&caller, Action::ListAllExpenses, None).is_err());
        assert!(authorize(&caller, Action::ExportBalanceSheet, None).is_err());
    }
}
