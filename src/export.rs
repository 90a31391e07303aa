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

//! Balance sheet CSV export.
//!
//! # CSV Format
//!
//! Columns: `Title, Amount, Split Type, Created By, Created At, Split Info`
//!
//! `Split Info` lists every allocation as `username: amount`, followed by
//! ` (percentage%)` for percentage splits, joined with `"; "`.
//!
//! ```csv
//! Title,Amount,Split Type,Created By,Created At,Split Info
//! Dinner,100.00,Percentage,alice,2025-03-01T19:30:00+00:00,alice: 70.00 (70.00%); bob: 30.00 (30.00%)
//! Taxi,30.00,Equal,bob,2025-03-01T23:10:00+00:00,alice: 15.00; bob: 15.00
//! ```

use crate::base::UserId;
use crate::error::ExportError;
use crate::ledger::{Expense, Ledger};
use crate::policy::{Action, Caller, authorize};
use csv::WriterBuilder;
use std::io::Write;

/// Header row of the balance sheet.
pub const BALANCE_SHEET_HEADER: [&str; 6] = [
    "Title",
    "Amount",
    "Split Type",
    "Created By",
    "Created At",
    "Split Info",
];

/// Writes every expense in the ledger as a CSV balance sheet.
///
/// The header is always written, even for an empty ledger.
///
/// # Errors
///
/// - [`ExportError::Ledger`] - Caller is not an admin.
/// - [`ExportError::Csv`] - Writing failed.
pub fn write_balance_sheet<W: Write>(
    ledger: &Ledger,
    caller: &Caller,
    writer: W,
) -> Result<(), ExportError> {
    authorize(caller, Action::ExportBalanceSheet, None)?;
    let expenses = ledger.snapshot();

    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(BALANCE_SHEET_HEADER)?;

    for expense in &expenses {
        let created_by = username(ledger, expense.created_by);
        wtr.write_record([
            expense.title.clone(),
            expense.amount.to_string(),
            expense.split_type.to_string(),
            created_by,
            expense.created_at.to_rfc3339(),
            split_info(ledger, expense),
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    tracing::debug!(rows = expenses.len(), "balance sheet written");
    Ok(())
}

/// Formats an expense's allocations for the `Split Info` column.
pub fn split_info(ledger: &Ledger, expense: &Expense) -> String {
    expense
        .splits
        .iter()
        .map(|split| {
            let name = username(ledger, split.user);
            match split.percentage {
                Some(percentage) => format!("{name}: {} ({percentage}%)", split.amount),
                None => format!("{name}: {}", split.amount),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn username(ledger: &Ledger, id: UserId) -> String {
    ledger
        .user(id)
        .map(|user| user.username)
        .unwrap_or_else(|| id.to_string())
}
