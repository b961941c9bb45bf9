//! Loan state machine
//!
//! ```text
//! PENDING ──approve──▶ APPROVED ──request-return──▶ RETURN_REQUESTED ──return──▶ RETURNED
//!    │                    ▲                                │
//!    └──reject──▶ REJECTED └──────────reject-return────────┘
//! ```
//!
//! `plan_transition` decides what a transition does without touching any
//! storage. Stores call it while holding the loan (and title) lock and then
//! persist the plan as one unit, so the precondition is checked against the
//! status at commit time.

use chrono::{DateTime, Duration, Utc};

use super::assessor::{self, FinePolicy};
use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{fine::NewFine, loan::BorrowRequest, Loan, LoanStatus},
};

/// Rules applied by the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRules {
    pub fine_policy: FinePolicy,
    pub default_loan_days: i64,
    pub allow_duplicate_active_loans: bool,
}

impl From<&AppConfig> for LoanRules {
    fn from(config: &AppConfig) -> Self {
        Self {
            fine_policy: FinePolicy::from(&config.fines),
            default_loan_days: config.loans.default_loan_days,
            allow_duplicate_active_loans: config.loans.allow_duplicate_active_loans,
        }
    }
}

impl Default for LoanRules {
    fn default() -> Self {
        LoanRules::from(&AppConfig::default())
    }
}

/// A transition requested on an existing loan
#[derive(Debug, Clone, PartialEq)]
pub enum LoanAction {
    /// Falls back to the proposed due date, then to the default loan period
    Approve { due_date: Option<DateTime<Utc>> },
    Reject,
    RequestReturn { requested_at: DateTime<Utc> },
    /// Falls back to the moment the return was requested
    ApproveReturn { returned_at: Option<DateTime<Utc>> },
    RejectReturn,
}

impl LoanAction {
    pub fn name(&self) -> &'static str {
        match self {
            LoanAction::Approve { .. } => "approve",
            LoanAction::Reject => "reject",
            LoanAction::RequestReturn { .. } => "request-return",
            LoanAction::ApproveReturn { .. } => "return",
            LoanAction::RejectReturn => "reject-return",
        }
    }

    /// Stored status the loan must have when the transition commits
    pub fn required_status(&self) -> LoanStatus {
        match self {
            LoanAction::Approve { .. } | LoanAction::Reject => LoanStatus::Pending,
            LoanAction::RequestReturn { .. } => LoanStatus::Approved,
            LoanAction::ApproveReturn { .. } | LoanAction::RejectReturn => LoanStatus::ReturnRequested,
        }
    }

    fn precondition_message(&self, current: LoanStatus) -> String {
        let rule = match self {
            LoanAction::Approve { .. } => "Only PENDING requests can be approved",
            LoanAction::Reject => "Only PENDING requests can be rejected",
            LoanAction::RequestReturn { .. } => "Only APPROVED or OVERDUE loans can be returned",
            LoanAction::ApproveReturn { .. } => "Only RETURN_REQUESTED loans can be marked as returned",
            LoanAction::RejectReturn => "Only RETURN_REQUESTED loans can have their return rejected",
        };
        format!("{}. Current status: {}", rule, current)
    }
}

/// What happens to the title's copy counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    Keep,
    Release,
}

/// Outcome of a planned transition, to be persisted atomically
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    /// Status the loan was seen in, as reported to readers
    pub from: LoanStatus,
    pub loan: Loan,
    pub ledger: LedgerEffect,
    pub fine: Option<NewFine>,
}

/// Check a borrow request before a copy is reserved for it
pub fn check_borrow(request: &BorrowRequest, has_active_loan: bool, rules: &LoanRules) -> AppResult<()> {
    if let Some(due) = request.due_date {
        if due <= request.borrow_date {
            return Err(AppError::Validation("dueDate must be after borrowDate".to_string()));
        }
    }
    if has_active_loan && !rules.allow_duplicate_active_loans {
        return Err(AppError::DuplicateActiveLoan(format!(
            "Borrower {} already has an active loan on title {}",
            request.borrower_id, request.title_id
        )));
    }
    Ok(())
}

/// Decide the effect of `action` on `loan` at instant `at`
pub fn plan_transition(loan: &Loan, action: &LoanAction, rules: &LoanRules, at: DateTime<Utc>) -> AppResult<TransitionPlan> {
    let from = assessor::effective_status(loan, at);

    if loan.status != action.required_status() {
        tracing::warn!(
            loan_id = loan.id,
            action = action.name(),
            status = %from,
            "Rejected loan transition"
        );
        return Err(AppError::InvalidTransition(action.precondition_message(from)));
    }

    let mut next = loan.clone();
    next.updated_at = at;
    let mut ledger = LedgerEffect::Keep;
    let mut fine = None;

    match action {
        LoanAction::Approve { due_date } => {
            let due = due_date
                .or(loan.requested_due_date)
                .unwrap_or_else(|| loan.borrow_date + Duration::days(rules.default_loan_days));
            if due <= loan.borrow_date {
                return Err(AppError::Validation("dueDate must be after borrowDate".to_string()));
            }
            next.status = LoanStatus::Approved;
            next.due_date = Some(due);
        }
        LoanAction::Reject => {
            next.status = LoanStatus::Rejected;
            ledger = LedgerEffect::Release;
        }
        LoanAction::RequestReturn { requested_at } => {
            ensure_not_before_borrow(loan, *requested_at)?;
            next.status = LoanStatus::ReturnRequested;
            next.return_requested_at = Some(*requested_at);
        }
        LoanAction::ApproveReturn { returned_at } => {
            let returned_at = returned_at.or(loan.return_requested_at).unwrap_or(at);
            ensure_not_before_borrow(loan, returned_at)?;
            fine = assessor::assess_on_return(loan, returned_at, &rules.fine_policy)?;
            next.status = LoanStatus::Returned;
            next.return_date = Some(returned_at);
            ledger = LedgerEffect::Release;
        }
        LoanAction::RejectReturn => {
            next.status = LoanStatus::Approved;
            next.return_requested_at = None;
        }
    }

    Ok(TransitionPlan {
        from,
        loan: next,
        ledger,
        fine,
    })
}

fn ensure_not_before_borrow(loan: &Loan, at: DateTime<Utc>) -> AppResult<()> {
    if at < loan.borrow_date {
        return Err(AppError::Validation(format!(
            "Return date {} is before borrow date {}",
            at, loan.borrow_date
        )));
    }
    Ok(())
}
