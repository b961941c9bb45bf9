//! Loan lifecycle service

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    assessor::{self, FinePolicy},
    lifecycle::{LoanAction, LoanRules},
    notifications::NotificationSink,
};
use crate::{
    error::AppResult,
    models::{
        loan::{BorrowRequest, LoanDetails, LoanOutcome, LoanQuery},
        notification::{Notification, NotificationKind},
        Fine, Loan,
    },
    repository::{Store, TransitionOutcome},
};

#[derive(Clone)]
pub struct LoansService {
    store: Store,
    rules: LoanRules,
    notifier: Arc<dyn NotificationSink>,
}

impl LoansService {
    pub fn new(store: Store, rules: LoanRules, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, rules, notifier }
    }

    /// Reserve a copy and open a pending loan
    pub async fn request_borrow(&self, request: BorrowRequest, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        let outcome = self.store.create_loan(&request, &self.rules, now).await?;

        tracing::info!(
            loan_id = outcome.loan.id,
            title_id = outcome.title.id,
            borrower_id = outcome.loan.borrower_id,
            available = outcome.title.available_copies,
            "Loan requested"
        );
        self.notifier.publish(
            Notification::new(
                NotificationKind::LoanRequested,
                outcome.loan.borrower_id,
                format!("Your request for \"{}\" is awaiting approval", outcome.title.name),
                now,
            )
            .for_loan(outcome.loan.id),
        );

        Ok(LoanOutcome {
            loan: assessor::describe(&outcome.loan, now),
            previous_status: None,
            available_copies: outcome.title.available_copies,
            fine: None,
            skipped_fine: None,
        })
    }

    pub async fn approve(&self, id: i64, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        self.transition(id, LoanAction::Approve { due_date }, now).await
    }

    pub async fn reject(&self, id: i64, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        self.transition(id, LoanAction::Reject, now).await
    }

    pub async fn request_return(&self, id: i64, requested_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        let requested_at = requested_at.unwrap_or(now);
        self.transition(id, LoanAction::RequestReturn { requested_at }, now).await
    }

    pub async fn approve_return(&self, id: i64, returned_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        self.transition(id, LoanAction::ApproveReturn { returned_at }, now).await
    }

    pub async fn reject_return(&self, id: i64, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        self.transition(id, LoanAction::RejectReturn, now).await
    }

    /// Get a loan with its read-time status
    pub async fn get(&self, id: i64, now: DateTime<Utc>) -> AppResult<LoanDetails> {
        let loan = self.store.get_loan(id).await?;
        Ok(assessor::describe(&loan, now))
    }

    /// Loans matching `query`, most recent activity first.
    ///
    /// The status filter applies to the effective status, so `OVERDUE`
    /// selects approved loans past their due date and `APPROVED` excludes them.
    pub async fn list(&self, query: &LoanQuery, now: DateTime<Utc>) -> AppResult<Vec<LoanDetails>> {
        let mut loans: Vec<LoanDetails> = self
            .store
            .list_loans(query)
            .await?
            .iter()
            .map(|loan| assessor::describe(loan, now))
            .filter(|loan| query.status.map_or(true, |s| loan.status == s))
            .collect();

        loans.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn transition(&self, id: i64, action: LoanAction, now: DateTime<Utc>) -> AppResult<LoanOutcome> {
        let outcome = self.store.apply_transition(id, &action, &self.rules, now).await?;

        tracing::info!(
            loan_id = id,
            action = action.name(),
            from = %outcome.from,
            to = %outcome.loan.status,
            available = outcome.title.available_copies,
            "Loan transition committed"
        );
        self.notify(&action, &outcome, now);

        Ok(LoanOutcome {
            loan: assessor::describe(&outcome.loan, now),
            previous_status: Some(outcome.from),
            available_copies: outcome.title.available_copies,
            fine: outcome.fine,
            skipped_fine: outcome.skipped_fine,
        })
    }

    fn notify(&self, action: &LoanAction, outcome: &TransitionOutcome, now: DateTime<Utc>) {
        let loan = &outcome.loan;
        let name = &outcome.title.name;
        let (kind, message) = match action {
            LoanAction::Approve { .. } => (NotificationKind::LoanApproved, approved_message(name, loan)),
            LoanAction::Reject => (
                NotificationKind::LoanRejected,
                format!("Your request for \"{}\" was rejected", name),
            ),
            LoanAction::RequestReturn { .. } => (
                NotificationKind::ReturnRequested,
                format!("Return of \"{}\" is awaiting confirmation", name),
            ),
            LoanAction::ApproveReturn { .. } => (
                NotificationKind::LoanReturned,
                format!("Return of \"{}\" confirmed", name),
            ),
            LoanAction::RejectReturn => (
                NotificationKind::ReturnRejected,
                format!("Return of \"{}\" was not confirmed; the loan is still open", name),
            ),
        };
        self.notifier
            .publish(Notification::new(kind, loan.borrower_id, message, now).for_loan(loan.id));

        if let Some(fine) = &outcome.fine {
            self.notifier
                .publish(fine_issued(fine, &self.rules.fine_policy, now));
        }
    }
}

fn approved_message(name: &str, loan: &Loan) -> String {
    match loan.due_date {
        Some(due) => format!("Your loan of \"{}\" is approved, due {}", name, due.format("%Y-%m-%d")),
        None => format!("Your loan of \"{}\" is approved", name),
    }
}

pub(crate) fn fine_issued(fine: &Fine, policy: &FinePolicy, now: DateTime<Utc>) -> Notification {
    Notification::new(
        NotificationKind::FineIssued,
        fine.borrower_id,
        format!(
            "A fine of {} was issued: {}",
            policy.format_amount(fine.amount),
            fine.reason
        ),
        now,
    )
    .for_loan(fine.loan_id)
    .for_fine(fine.id)
}
