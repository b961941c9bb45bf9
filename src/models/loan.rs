//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::LoanStatus;
use super::fine::{Fine, NewFine};
use super::title::Reservation;
use crate::error::{AppError, AppResult};

/// Loan as stored. `status` is never `Overdue` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: i64,
    pub title_id: i64,
    pub borrower_id: i64,
    pub borrow_date: DateTime<Utc>,
    /// Due date proposed with the borrow request
    pub requested_due_date: Option<DateTime<Utc>>,
    /// Set on approval
    pub due_date: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    /// Set when the return is approved
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    /// Most recent activity on this loan
    pub updated_at: DateTime<Utc>,
}

/// Internal row structure for database queries (status as text)
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    id: i64,
    title_id: i64,
    borrower_id: i64,
    borrow_date: DateTime<Utc>,
    requested_due_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    return_requested_at: Option<DateTime<Utc>>,
    return_date: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = AppError;

    fn try_from(row: LoanRow) -> AppResult<Self> {
        let status: LoanStatus = row.status.parse().map_err(AppError::Internal)?;
        if status == LoanStatus::Overdue {
            return Err(AppError::invariant(format!(
                "Loan {} has a stored OVERDUE status",
                row.id
            )));
        }
        Ok(Loan {
            id: row.id,
            title_id: row.title_id,
            borrower_id: row.borrower_id,
            borrow_date: row.borrow_date,
            requested_due_date: row.requested_due_date,
            due_date: row.due_date,
            return_requested_at: row.return_requested_at,
            return_date: row.return_date,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Borrow request as received from a borrower
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub title_id: i64,
    pub borrower_id: i64,
    pub borrow_date: DateTime<Utc>,
    /// Proposed due date, confirmed or replaced on approval
    pub due_date: Option<DateTime<Utc>>,
}

/// A pending loan ready to be stored, backed by a reserved copy
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub title_id: i64,
    pub borrower_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub requested_due_date: Option<DateTime<Utc>>,
}

impl NewLoan {
    /// Consume a reservation into a pending loan
    pub fn from_reservation(reservation: Reservation, request: &BorrowRequest) -> Self {
        Self {
            title_id: reservation.title_id(),
            borrower_id: request.borrower_id,
            borrow_date: request.borrow_date,
            requested_due_date: request.due_date,
        }
    }

    pub fn into_loan(self, id: i64, created_at: DateTime<Utc>) -> Loan {
        Loan {
            id,
            title_id: self.title_id,
            borrower_id: self.borrower_id,
            borrow_date: self.borrow_date,
            requested_due_date: self.requested_due_date,
            due_date: None,
            return_requested_at: None,
            return_date: None,
            status: LoanStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Loan with its read-time status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    pub id: i64,
    pub title_id: i64,
    pub borrower_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub requested_due_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    /// Effective status (`OVERDUE` when derived)
    pub status: LoanStatus,
    pub is_overdue: bool,
    /// Whole days past the due date as of the read
    pub days_overdue: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a borrow request or transition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanOutcome {
    pub loan: LoanDetails,
    /// Effective status before the transition; absent for new requests
    pub previous_status: Option<LoanStatus>,
    /// Available copies of the title after the change
    pub available_copies: i32,
    /// Fine assessed by the transition
    pub fine: Option<Fine>,
    /// Late fee that was not recorded because an unpaid fine was already open
    pub skipped_fine: Option<NewFine>,
}

/// Body of PATCH /loan/{id}/approve
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveLoan {
    /// Confirmed due date; defaults to the proposed one, then to the loan period
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of PATCH /loan/{id}/request-return
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestReturn {
    /// When the copy was handed in; defaults to now
    pub requested_at: Option<DateTime<Utc>>,
}

/// Body of PATCH /loan/{id}/return
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveReturn {
    /// Actual return date; defaults to when the return was requested
    pub return_date: Option<DateTime<Utc>>,
}

/// Query parameters for loan lists
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanQuery {
    /// Effective status filter (`OVERDUE` selects derived overdue loans)
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<i64>,
    pub title_id: Option<i64>,
}
