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

use clap::Parser;
use csv::{ReaderBuilder, Trim};
use expense_split::ledger::normalize_title;
use expense_split::{
    Expense, Ledger, LedgerError, Money, NewExpense, ParticipantInput, RemainderPolicy,
    SplitEngine, SplitStrategy, UserId, write_balance_sheet,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process;

/// Expense Splitter - Split shared expenses from a CSV file
///
/// Reads expense rows from a CSV file, splits each expense among its
/// participants and writes the resulting balance sheet to stdout.
#[derive(Parser, Debug)]
#[command(name = "expense-split")]
#[command(about = "Splits shared expenses from a CSV file and prints the balance sheet", long_about = None)]
struct Args {
    /// Path to CSV file with expense rows
    ///
    /// Expected format: expense,title,amount,split_type,created_by,participant,share
    /// Example: cargo run -- expenses.csv > balance_sheet.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Give leftover cents to individual participants so every expense balances exactly
    #[arg(long, env = "EXPENSE_DISTRIBUTE_REMAINDER")]
    distribute_remainder: bool,

    /// Admin user the balance sheet is exported as
    #[arg(long, env = "EXPENSE_OPERATOR", default_value = "admin")]
    operator: String,

    /// Log filter written to stderr (e.g. `info`, `expense_split=debug`)
    #[arg(long, env = "EXPENSE_LOG", default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(args.log_level.as_str())
        .init();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let remainder = if args.distribute_remainder {
        RemainderPolicy::Distribute
    } else {
        RemainderPolicy::Preserve
    };
    let ledger = Ledger::with_engine(SplitEngine::with_remainder_policy(remainder));

    let operator = match ledger
        .register_user(&args.operator, true)
        .and_then(|user| ledger.caller(user.id))
    {
        Ok(caller) => caller,
        Err(e) => {
            eprintln!("Invalid operator '{}': {}", args.operator, e);
            process::exit(1);
        }
    };

    match process_expenses(BufReader::new(file), &ledger) {
        Ok(recorded) => tracing::info!(recorded, "expenses processed"),
        Err(e) => {
            eprintln!("Error processing expenses: {}", e);
            process::exit(1);
        }
    }

    if let Err(e) = write_balance_sheet(&ledger, &operator, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `expense, title, amount, split_type, created_by, participant, share`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    expense: String,
    title: String,
    amount: Decimal,
    split_type: String,
    created_by: String,
    participant: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    share: Option<Decimal>,
}

/// Rows sharing one `expense` key, collected before splitting.
#[derive(Debug)]
struct PendingExpense {
    key: String,
    title: String,
    amount: Decimal,
    split_type: String,
    created_by: String,
    participants: Vec<(String, Option<Decimal>)>,
}

impl PendingExpense {
    fn start(record: CsvRecord) -> Self {
        Self {
            key: record.expense,
            title: record.title,
            amount: record.amount,
            split_type: record.split_type,
            created_by: record.created_by,
            participants: vec![(record.participant, record.share)],
        }
    }

    /// Splits the expense and stores it.
    ///
    /// The split is validated against provisional ids first. Unknown usernames
    /// are registered only once the expense is known to be accepted, so a
    /// rejected expense never adds users to the ledger.
    fn record(self, ledger: &Ledger) -> Result<Expense, LedgerError> {
        let split_type: SplitStrategy = self.split_type.parse()?;
        let amount = Money::new(self.amount)?;
        normalize_title(&self.title)?;

        let mut roster = Roster::new(ledger);
        let creator = roster.resolve(&self.created_by)?;
        let splits = self
            .participants
            .into_iter()
            .map(|(name, share)| {
                let user = roster.resolve(&name)?;
                Ok(match split_type {
                    SplitStrategy::Equal => ParticipantInput::equal(user),
                    SplitStrategy::Exact => ParticipantInput {
                        user,
                        amount: share.map(Money::new).transpose()?,
                        percentage: None,
                    },
                    SplitStrategy::Percentage => ParticipantInput {
                        user,
                        amount: None,
                        percentage: share,
                    },
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        ledger.engine().compute(amount, split_type, &splits)?;

        let registered = roster.register()?;
        let real = |id: UserId| registered.get(&id).copied().unwrap_or(id);
        let creator = ledger.caller(real(creator))?;
        let splits = splits
            .into_iter()
            .map(|split| ParticipantInput {
                user: real(split.user),
                ..split
            })
            .collect();

        ledger.create_expense(
            &creator,
            NewExpense {
                title: self.title,
                amount,
                split_type,
                splits,
            },
        )
    }
}

/// Usernames of one expense, resolved without registering anyone.
///
/// Known users map to their ids. Unknown names get provisional ids counted
/// down from `u32::MAX`, one per distinct name, until [`Roster::register`].
struct Roster<'a> {
    ledger: &'a Ledger,
    unknown: Vec<String>,
}

impl<'a> Roster<'a> {
    fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            unknown: Vec::new(),
        }
    }

    fn resolve(&mut self, username: &str) -> Result<UserId, LedgerError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::InvalidUsername);
        }
        if let Some(user) = self.ledger.user_by_name(username) {
            return Ok(user.id);
        }

        let index = match self.unknown.iter().position(|name| name == username) {
            Some(index) => index,
            None => {
                self.unknown.push(username.to_string());
                self.unknown.len() - 1
            }
        };
        Ok(provisional_id(index))
    }

    /// Registers every unknown name, mapping provisional ids to real ones.
    fn register(self) -> Result<HashMap<UserId, UserId>, LedgerError> {
        self.unknown
            .iter()
            .enumerate()
            .map(|(index, username)| {
                let user = self.ledger.register_user(username, false)?;
                Ok((provisional_id(index), user.id))
            })
            .collect()
    }
}

fn provisional_id(index: usize) -> UserId {
    UserId(u32::MAX - index as u32)
}

/// Process expense rows from a CSV reader into `ledger`.
///
/// Consecutive rows with the same `expense` key make up one expense. The
/// first row of a group supplies the title, amount, split type and creator;
/// every row adds one participant. Malformed rows and rejected expenses are
/// skipped with a warning.
///
/// # CSV Format
///
/// - `expense`: Grouping key
/// - `title`: Expense title
/// - `amount`: Total amount (at most 2 decimals)
/// - `split_type`: EQUAL, EXACT or PERCENTAGE
/// - `created_by`: Username of the creator
/// - `participant`: Username of the participant
/// - `share`: Amount (EXACT), percentage (PERCENTAGE) or empty (EQUAL)
///
/// # Example
///
/// ```csv
/// expense,title,amount,split_type,created_by,participant,share
/// 1,Dinner,100.00,PERCENTAGE,alice,alice,70
/// 1,Dinner,100.00,PERCENTAGE,alice,bob,30
/// 2,Taxi,30.00,EQUAL,bob,alice,
/// 2,Taxi,30.00,EQUAL,bob,bob,
/// ```
///
/// Returns the number of expenses recorded.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_expenses<R: Read>(reader: R, ledger: &Ledger) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow missing share field
        .has_headers(true)
        .from_reader(reader);

    let mut recorded = 0;
    let mut pending: Option<PendingExpense> = None;

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed row");
                continue;
            }
        };

        match pending.as_mut() {
            Some(group) if group.key == record.expense => {
                group.participants.push((record.participant, record.share));
            }
            _ => {
                if let Some(group) = pending.replace(PendingExpense::start(record)) {
                    recorded += flush(group, ledger);
                }
            }
        }
    }

    if let Some(group) = pending {
        recorded += flush(group, ledger);
    }

    Ok(recorded)
}

fn flush(group: PendingExpense, ledger: &Ledger) -> usize {
    let key = group.key.clone();
    match group.record(ledger) {
        Ok(expense) => {
            tracing::debug!(key = %key, expense_id = %expense.id, "expense recorded");
            1
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "skipping expense");
            0
        }
    }
}
