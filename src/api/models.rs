use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::core::balance::{BalanceSheet, Transfer};
use crate::core::errors::{ErrorKind, LedgerError};
use crate::core::models::expense::{Expense, MoneyShare, PercentShare, SplitType, Splits};
use crate::core::models::traveler::Traveler;
use crate::core::money::{Cents, Percentage};
use crate::core::split::owed_amounts;

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct RegisterTravelerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTripRequest {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// Exactly one of `traveler_id` and `email` must be set.
#[derive(Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub traveler_id: Option<String>,
    pub email: Option<String>,
}

/// One split entry as sent by clients: `cost` for money splits,
/// `percentage` for percentage splits, never both.
#[derive(Deserialize, Serialize, ToSchema, Clone, Debug)]
pub struct SplitEntryDto {
    pub member_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEqualExpenseRequest {
    pub title: String,
    pub payer_id: String,
    pub total_cost: f64,
    pub split_type: SplitType,
    /// Members sharing the cost; every trip member when empty.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExpenseRequest {
    pub title: String,
    pub payer_id: String,
    pub total_cost: f64,
    pub split_type: SplitType,
    pub splits: Vec<SplitEntryDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct ModifyExpenseRequest {
    pub title: Option<String>,
    pub payer_id: Option<String>,
    pub total_cost: f64,
    pub split_type: SplitType,
    pub splits: Vec<SplitEntryDto>,
    pub expected_version: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ModifyTotalCostRequest {
    pub total_cost: f64,
    pub expected_version: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ConvertExpenseRequest {
    pub target_type: SplitType,
    pub expected_version: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListExpensesQuery {
    /// `money` or `percentage`; both when absent.
    pub split_type: Option<SplitType>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteExpenseQuery {
    pub expected_version: Option<u64>,
}

// Response structs
#[derive(Serialize, ToSchema)]
pub struct TravelerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<Traveler> for TravelerResponse {
    fn from(traveler: Traveler) -> Self {
        TravelerResponse {
            id: traveler.id,
            name: traveler.name,
            email: traveler.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SplitEntryResponse {
    pub member_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Amount this member owes for the expense.
    pub owed: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: String,
    pub trip_id: String,
    pub title: String,
    pub total_cost: f64,
    pub payer_id: String,
    pub split_type: SplitType,
    pub splits: Vec<SplitEntryResponse>,
    pub version: u64,
    pub created_by: String,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        let owed: BTreeMap<&str, Cents> = owed_amounts(expense.total_cost, &expense.splits)
            .unwrap_or_default()
            .into_iter()
            .collect();
        let owed_by = |member_id: &str| owed.get(member_id).copied().unwrap_or_default().to_decimal();
        let splits = match &expense.splits {
            Splits::Money(shares) => shares
                .iter()
                .map(|s| SplitEntryResponse {
                    member_id: s.member_id.clone(),
                    cost: Some(s.cost.to_decimal()),
                    percentage: None,
                    owed: owed_by(&s.member_id),
                })
                .collect(),
            Splits::Percentage(shares) => shares
                .iter()
                .map(|s| SplitEntryResponse {
                    member_id: s.member_id.clone(),
                    cost: None,
                    percentage: Some(s.percentage.to_decimal()),
                    owed: owed_by(&s.member_id),
                })
                .collect(),
        };
        ExpenseResponse {
            split_type: expense.split_type(),
            id: expense.id,
            trip_id: expense.trip_id,
            title: expense.title,
            total_cost: expense.total_cost.to_decimal(),
            payer_id: expense.payer_id,
            splits,
            version: expense.version,
            created_by: expense.created_by,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ExpenseSummary {
    pub id: String,
    pub title: String,
    pub total_cost: f64,
    pub split_type: SplitType,
    pub payer_id: String,
    pub version: u64,
}

impl From<Expense> for ExpenseSummary {
    fn from(expense: Expense) -> Self {
        ExpenseSummary {
            split_type: expense.split_type(),
            id: expense.id,
            title: expense.title,
            total_cost: expense.total_cost.to_decimal(),
            payer_id: expense.payer_id,
            version: expense.version,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SkippedExpenseResponse {
    pub expense_id: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct BalancesResponse {
    pub trip_id: String,
    /// Signed balance per member id. Positive: the group owes the member.
    pub balances: BTreeMap<String, f64>,
    pub skipped: Vec<SkippedExpenseResponse>,
}

impl BalancesResponse {
    pub fn new(trip_id: String, sheet: BalanceSheet) -> Self {
        BalancesResponse {
            trip_id,
            balances: sheet
                .balances
                .into_iter()
                .map(|(member_id, balance)| (member_id, balance.to_decimal()))
                .collect(),
            skipped: sheet
                .skipped
                .into_iter()
                .map(|s| SkippedExpenseResponse {
                    expense_id: s.expense_id,
                    reason: s.reason,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TransferResponse {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl From<Transfer> for TransferResponse {
    fn from(transfer: Transfer) -> Self {
        TransferResponse {
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount.to_decimal(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SettlementPlanResponse {
    pub trip_id: String,
    pub transfers: Vec<TransferResponse>,
}

pub fn cents_from_dto(field: &str, value: f64) -> Result<Cents, LedgerError> {
    Cents::from_decimal(value).ok_or_else(|| {
        LedgerError::invalid_input(
            field,
            "Invalid Amount",
            "Amount must be a finite number with at most 2 decimal places",
        )
    })
}

fn percentage_from_dto(field: &str, value: f64) -> Result<Percentage, LedgerError> {
    Percentage::from_decimal(value).ok_or_else(|| {
        LedgerError::invalid_input(
            field,
            "Invalid Percentage",
            "Percentage must be a finite number with at most 2 decimal places",
        )
    })
}

/// Turns client split entries into the typed split set for `split_type`.
pub fn splits_from_dto(split_type: SplitType, entries: Vec<SplitEntryDto>) -> Result<Splits, LedgerError> {
    match split_type {
        SplitType::Money => entries
            .into_iter()
            .map(|entry| match (entry.cost, entry.percentage) {
                (Some(cost), None) => Ok(MoneyShare {
                    cost: cents_from_dto("cost", cost)?,
                    member_id: entry.member_id,
                }),
                _ => Err(LedgerError::InvalidSplit(format!(
                    "money split entry for {} must carry a cost and no percentage",
                    entry.member_id
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Splits::Money),
        SplitType::Percentage => entries
            .into_iter()
            .map(|entry| match (entry.cost, entry.percentage) {
                (None, Some(percentage)) => Ok(PercentShare {
                    percentage: percentage_from_dto("percentage", percentage)?,
                    member_id: entry.member_id,
                }),
                _ => Err(LedgerError::InvalidSplit(format!(
                    "percentage split entry for {} must carry a percentage and no cost",
                    entry.member_id
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Splits::Percentage),
    }
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// Newtype wrapper for LedgerError to implement IntoResponse
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ConversionError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ConcurrentModificationError | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
