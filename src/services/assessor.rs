//! Overdue derivation and fine assessment
//!
//! Everything here is a pure function of the loan and an instant; nothing
//! writes `OVERDUE` anywhere.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    config::FinesConfig,
    error::{AppError, AppResult},
    models::{
        fine::{CreateFine, NewFine},
        loan::LoanDetails,
        Loan, LoanStatus,
    },
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Amount policy for automatic fines
#[derive(Debug, Clone, PartialEq)]
pub struct FinePolicy {
    pub daily_rate: Decimal,
    /// Label shown next to amounts in notifications
    pub currency: String,
}

impl From<&FinesConfig> for FinePolicy {
    fn from(config: &FinesConfig) -> Self {
        Self {
            daily_rate: config.daily_rate,
            currency: config.currency.clone(),
        }
    }
}

impl FinePolicy {
    pub fn amount_for(&self, days_overdue: i64) -> Decimal {
        self.daily_rate * Decimal::from(days_overdue)
    }

    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{} {}", amount, self.currency)
    }
}

/// True iff the loan is approved, not yet handed back, and past its due date
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.status == LoanStatus::Approved && loan.due_date.map_or(false, |due| due < now)
}

/// Status as seen by every read path
pub fn effective_status(loan: &Loan, now: DateTime<Utc>) -> LoanStatus {
    if is_overdue(loan, now) {
        LoanStatus::Overdue
    } else {
        loan.status
    }
}

/// Started days between `due` and `at`; zero when `at` is not after `due`
pub fn days_overdue(due: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    let seconds = (at - due).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Fine owed for a return at `returned_at`, if any
pub fn assess_on_return(loan: &Loan, returned_at: DateTime<Utc>, policy: &FinePolicy) -> AppResult<Option<NewFine>> {
    let due = loan
        .due_date
        .ok_or_else(|| AppError::invariant(format!("Loan {} is being returned without a due date", loan.id)))?;

    let days = days_overdue(due, returned_at);
    if days == 0 {
        return Ok(None);
    }

    let days_overdue = i32::try_from(days)
        .map_err(|_| AppError::invariant(format!("Loan {} is {} days overdue", loan.id, days)))?;

    Ok(Some(NewFine {
        loan_id: loan.id,
        title_id: loan.title_id,
        borrower_id: loan.borrower_id,
        amount: policy.amount_for(days),
        days_overdue,
        reason: late_reason(days),
    }))
}

fn late_reason(days: i64) -> String {
    if days == 1 {
        "Returned 1 day late".to_string()
    } else {
        format!("Returned {} days late", days)
    }
}

/// Check a librarian-entered fine against the loan it targets.
///
/// `days_overdue` must be at least one and no more than the overdue days of
/// the loan as of its return (or `now` while it is still out).
pub fn validate_fine_amounts(loan: &Loan, amount: Decimal, days: i32, now: DateTime<Utc>) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Fine amount must be positive".to_string()));
    }
    if days < 1 {
        return Err(AppError::Validation("daysOverdue must be at least 1".to_string()));
    }
    let due = loan.due_date.ok_or_else(|| {
        AppError::Validation(format!("Loan {} has no due date and cannot be fined", loan.id))
    })?;
    let measured_at = loan.return_date.unwrap_or(now);
    let actual = days_overdue(due, measured_at);
    if i64::from(days) > actual {
        return Err(AppError::Validation(format!(
            "daysOverdue {} exceeds the {} day(s) loan {} is overdue",
            days, actual, loan.id
        )));
    }
    Ok(())
}

/// Build a manual fine for a loan
pub fn manual_fine(loan: &Loan, request: &CreateFine, now: DateTime<Utc>) -> AppResult<NewFine> {
    if request.loan_id != loan.id {
        return Err(AppError::BadRequest("Fine request does not match the loan".to_string()));
    }
    validate_fine_amounts(loan, request.amount, request.days_overdue, now)?;
    Ok(NewFine {
        loan_id: loan.id,
        title_id: loan.title_id,
        borrower_id: loan.borrower_id,
        amount: request.amount,
        days_overdue: request.days_overdue,
        reason: request.reason.trim().to_string(),
    })
}

/// Read view of a loan at `now`
pub fn describe(loan: &Loan, now: DateTime<Utc>) -> LoanDetails {
    let overdue = is_overdue(loan, now);
    LoanDetails {
        id: loan.id,
        title_id: loan.title_id,
        borrower_id: loan.borrower_id,
        borrow_date: loan.borrow_date,
        requested_due_date: loan.requested_due_date,
        due_date: loan.due_date,
        return_requested_at: loan.return_requested_at,
        return_date: loan.return_date,
        status: effective_status(loan, now),
        is_overdue: overdue,
        days_overdue: match (overdue, loan.due_date) {
            (true, Some(due)) => days_overdue(due, now),
            _ => 0,
        },
        created_at: loan.created_at,
        updated_at: loan.updated_at,
    }
}
