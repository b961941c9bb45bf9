//! Fine model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::FineStatus;
use crate::error::{AppError, AppResult};

/// Monetary penalty attached to a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fine {
    pub id: i64,
    pub loan_id: i64,
    pub title_id: i64,
    pub borrower_id: i64,
    pub amount: Decimal,
    pub days_overdue: i32,
    pub reason: String,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Fine {
    /// Settle the fine. A paid fine cannot be paid again.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if self.status != FineStatus::Unpaid {
            return Err(AppError::InvalidTransition(format!(
                "Only UNPAID fines can be paid. Current status: {}",
                self.status
            )));
        }
        self.status = FineStatus::Paid;
        self.paid_at = Some(at);
        Ok(())
    }

    /// Apply a librarian edit. Paid fines are immutable.
    pub fn apply_update(&mut self, update: &UpdateFine) -> AppResult<()> {
        if self.status != FineStatus::Unpaid {
            return Err(AppError::InvalidTransition(format!(
                "Only UNPAID fines can be edited. Current status: {}",
                self.status
            )));
        }
        if let Some(amount) = update.amount {
            self.amount = amount;
        }
        if let Some(ref reason) = update.reason {
            self.reason = reason.clone();
        }
        if let Some(days) = update.days_overdue {
            self.days_overdue = days;
        }
        Ok(())
    }
}

/// Internal row structure for database queries (status as text)
#[derive(Debug, Clone, FromRow)]
pub struct FineRow {
    id: i64,
    loan_id: i64,
    title_id: i64,
    borrower_id: i64,
    amount: Decimal,
    days_overdue: i32,
    reason: String,
    status: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<FineRow> for Fine {
    type Error = AppError;

    fn try_from(row: FineRow) -> AppResult<Self> {
        Ok(Fine {
            id: row.id,
            loan_id: row.loan_id,
            title_id: row.title_id,
            borrower_id: row.borrower_id,
            amount: row.amount,
            days_overdue: row.days_overdue,
            reason: row.reason,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

/// A validated fine ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFine {
    pub loan_id: i64,
    pub title_id: i64,
    pub borrower_id: i64,
    pub amount: Decimal,
    pub days_overdue: i32,
    pub reason: String,
}

impl NewFine {
    pub fn into_fine(self, id: i64, created_at: DateTime<Utc>) -> Fine {
        Fine {
            id,
            loan_id: self.loan_id,
            title_id: self.title_id,
            borrower_id: self.borrower_id,
            amount: self.amount,
            days_overdue: self.days_overdue,
            reason: self.reason,
            status: FineStatus::Unpaid,
            created_at,
            paid_at: None,
        }
    }
}

/// Manual fine creation request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFine {
    pub loan_id: i64,
    pub amount: Decimal,
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: String,
    #[validate(range(min = 1, message = "daysOverdue must be at least 1"))]
    pub days_overdue: i32,
}

/// Fine edit request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFine {
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: Option<String>,
    #[validate(range(min = 1, message = "daysOverdue must be at least 1"))]
    pub days_overdue: Option<i32>,
}

/// Body of PATCH /fine/{id}/pay
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayFine {
    /// Payment date; defaults to now
    pub paid_at: Option<DateTime<Utc>>,
}

/// Query parameters for fine lists
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FineQuery {
    pub status: Option<FineStatus>,
    pub borrower_id: Option<i64>,
    pub loan_id: Option<i64>,
}
