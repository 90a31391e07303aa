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

//! REST API over the [`Ledger`].
//!
//! ## Endpoints
//!
//! - `POST /users` - Register a user and receive a bearer token
//! - `POST /expenses` - Record an expense
//! - `GET /expenses/mine` - Expenses created by the caller
//! - `GET /expenses` - All expenses (admin)
//! - `GET /expenses/{id}` - One expense
//! - `PUT /expenses/{id}` - Replace an expense and all its splits
//! - `DELETE /expenses/{id}` - Delete an expense
//! - `GET /expenses/balance-sheet` - CSV balance sheet (admin)
//!
//! Every `/expenses` route expects `Authorization: Bearer <token>`.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/expenses \
//!   -H "Authorization: Bearer $TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"title": "Dinner", "amount": "100.00", "split_type": "PERCENTAGE",
//!        "splits": [{"user": 1, "percentage": "70"}, {"user": 2, "percentage": "30"}]}'
//! ```

use crate::{
    Caller, Expense, ExpenseId, ExportError, Ledger, LedgerError, Money, NewExpense,
    ParticipantInput, UserId, ValidationError, write_balance_sheet,
};
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// === Request/Response DTOs ===

/// Request body for creating or replacing an expense.
///
/// ```json
/// {"title": "Taxi", "amount": "30.00", "split_type": "EXACT",
///  "splits": [{"user": 1, "amount": "10.00"}, {"user": 2, "amount": "20.00"}]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub title: String,
    pub amount: Decimal,
    pub split_type: String,
    pub splits: Vec<SplitRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub user: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
}

impl ExpenseRequest {
    /// Converts the raw request into ledger input, checking the strategy tag
    /// and monetary precision on the way.
    pub fn into_new_expense(self) -> Result<NewExpense, ValidationError> {
        let split_type = self.split_type.parse()?;
        let amount = Money::new(self.amount)?;
        let splits = self
            .splits
            .into_iter()
            .map(|split| {
                Ok(ParticipantInput {
                    user: UserId(split.user),
                    amount: split.amount.map(Money::new).transpose()?,
                    percentage: split.percentage,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(NewExpense {
            title: self.title,
            amount,
            split_type,
            splits,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
    pub token: String,
}

/// Response body for errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Identity ===

/// Maps opaque bearer tokens to users.
///
/// Stands in for the identity collaborator: handlers only ever see the
/// resolved [`Caller`], never the token.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: DashMap<String, UserId>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh random token for `user`.
    pub fn issue(&self, user: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user);
        token
    }

    /// Registers a known token, e.g. one provisioned from configuration.
    pub fn insert(&self, token: impl Into<String>, user: UserId) {
        self.tokens.insert(token.into(), user);
    }

    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).map(|entry| *entry.value())
    }
}

// === Application State ===

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub identities: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
            identities: Arc::new(TokenRegistry::new()),
        }
    }
}

/// Extracts the authenticated caller from the `Authorization` header.
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AppError::Unauthorized)?;

        let user_id = state
            .identities
            .resolve(token)
            .ok_or(AppError::Unauthorized)?;
        let caller = state
            .ledger
            .caller(user_id)
            .map_err(|_| AppError::Unauthorized)?;
        Ok(Authenticated(caller))
    }
}

// === Error Handling ===

/// Error type returned by every handler.
#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Ledger(err.into())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Ledger(err) => AppError::Ledger(err),
            ExportError::Csv(err) => AppError::Internal(err.to_string()),
        }
    }
}

fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::EmptyParticipantSet => "EMPTY_PARTICIPANT_SET",
        ValidationError::NonPositiveTotal(_) => "INVALID_AMOUNT",
        ValidationError::DuplicateParticipant(_) => "DUPLICATE_PARTICIPANT",
        ValidationError::MissingAmount(_) => "MISSING_AMOUNT",
        ValidationError::MissingPercentage(_) => "MISSING_PERCENTAGE",
        ValidationError::NegativeShare(_) => "NEGATIVE_SHARE",
        ValidationError::ExcessPrecision(_) => "EXCESS_PRECISION",
        ValidationError::OutOfRange { .. } => "VALUE_OUT_OF_RANGE",
        ValidationError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
        ValidationError::PercentageMismatch { .. } => "PERCENTAGE_MISMATCH",
        ValidationError::UnknownStrategy(_) => "UNKNOWN_SPLIT_TYPE",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "missing or invalid bearer token".to_string(),
            ),
            AppError::Internal(message) => {
                tracing::error!(%message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error".to_string(),
                )
            }
            AppError::Ledger(err) => {
                let (status, code) = match err {
                    LedgerError::Validation(err) => (StatusCode::BAD_REQUEST, validation_code(err)),
                    LedgerError::InvalidTitle => (StatusCode::BAD_REQUEST, "INVALID_TITLE"),
                    LedgerError::InvalidUsername => (StatusCode::BAD_REQUEST, "INVALID_USERNAME"),
                    LedgerError::DuplicateUsername(_) => (StatusCode::CONFLICT, "DUPLICATE_USERNAME"),
                    LedgerError::UnknownUser(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_USER"),
                    LedgerError::ExpenseNotFound(_) => (StatusCode::NOT_FOUND, "EXPENSE_NOT_FOUND"),
                    LedgerError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                };
                (status, code, err.to_string())
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /users - Register an ordinary user.
async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.ledger.register_user(&request.username, false)?;
    let token = state.identities.issue(user.id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            token,
        }),
    ))
}

/// POST /expenses - Record a new expense.
async fn create_expense(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Json(request): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense = state
        .ledger
        .create_expense(&caller, request.into_new_expense()?)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /expenses/mine - Expenses created by the caller.
async fn my_expenses(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Expense>>, AppError> {
    Ok(Json(state.ledger.expenses_created_by(&caller)?))
}

/// GET /expenses - Every expense (admin only).
async fn all_expenses(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Expense>>, AppError> {
    Ok(Json(state.ledger.all_expenses(&caller)?))
}

/// GET /expenses/{id} - One expense.
async fn get_expense(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<u32>,
) -> Result<Json<Expense>, AppError> {
    Ok(Json(state.ledger.expense(&caller, ExpenseId(id))?))
}

/// PUT /expenses/{id} - Replace an expense and all of its splits.
async fn update_expense(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<u32>,
    Json(request): Json<ExpenseRequest>,
) -> Result<Json<Expense>, AppError> {
    let expense =
        state
            .ledger
            .update_expense(&caller, ExpenseId(id), request.into_new_expense()?)?;
    Ok(Json(expense))
}

/// DELETE /expenses/{id} - Delete an expense.
async fn delete_expense(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    state.ledger.delete_expense(&caller, ExpenseId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /expenses/balance-sheet - CSV download of every expense (admin only).
async fn balance_sheet(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Response, AppError> {
    let mut body = Vec::new();
    write_balance_sheet(&state.ledger, &caller, &mut body)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"balance_sheet.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

// === Router ===

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(register_user))
        .route("/expenses", get(all_expenses).post(create_expense))
        .route("/expenses/mine", get(my_expenses))
        .route("/expenses/balance-sheet", get(balance_sheet))
        .route(
            "/expenses/{id}",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .with_state(state)
}
