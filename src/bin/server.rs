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

//! REST API server for the expense ledger.
//!
//! Run with: `cargo run --bin expense-server -- --admin root:secret-token`
//!
//! Admins are provisioned at startup with a fixed token; ordinary users
//! register themselves through `POST /users`.

use clap::Parser;
use expense_split::api::{AppState, router};
use expense_split::{Ledger, RemainderPolicy, SplitEngine};
use std::process;
use tokio::net::TcpListener;

/// Expense API server
#[derive(Parser, Debug)]
#[command(name = "expense-server")]
#[command(about = "Serves the expense ledger over HTTP", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "EXPENSE_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Admin account as `username:token`; may be repeated
    #[arg(long = "admin", env = "EXPENSE_ADMINS", value_delimiter = ',')]
    admins: Vec<String>,

    /// Give leftover cents to individual participants so every expense balances exactly
    #[arg(long, env = "EXPENSE_DISTRIBUTE_REMAINDER")]
    distribute_remainder: bool,

    /// Log filter (e.g. `info`, `expense_split=debug`)
    #[arg(long, env = "EXPENSE_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .init();

    let remainder = if args.distribute_remainder {
        RemainderPolicy::Distribute
    } else {
        RemainderPolicy::Preserve
    };
    let state = AppState::new(Ledger::with_engine(SplitEngine::with_remainder_policy(
        remainder,
    )));

    for admin in &args.admins {
        let Some((username, token)) = admin.split_once(':') else {
            eprintln!("Invalid --admin '{}': expected username:token", admin);
            process::exit(1);
        };
        match state.ledger.register_user(username, true) {
            Ok(user) => state.identities.insert(token.trim(), user.id),
            Err(e) => {
                eprintln!("Invalid --admin '{}': {}", username, e);
                process::exit(1);
            }
        }
    }

    let listener = match TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Error binding {}: {}", args.bind, e);
            process::exit(1);
        }
    };
    tracing::info!(bind = %args.bind, ?remainder, admins = args.admins.len(), "expense API listening");

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(error = %e, "server failed");
        process::exit(1);
    }
}
