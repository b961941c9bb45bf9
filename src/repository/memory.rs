//! In-memory store
//!
//! All state sits behind one `RwLock`. Every mutation holds the write lock
//! for its whole duration, which makes each operation a single atomic unit;
//! reads and snapshots clone under the read lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{BorrowOutcome, CirculationStore, TransitionOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrower::CreateBorrower,
        fine::{CreateFine, FineQuery, NewFine, UpdateFine},
        loan::{BorrowRequest, LoanQuery, NewLoan},
        stats::HistorySnapshot,
        title::{CreateTitle, Reservation},
        Borrower, Fine, FineStatus, Loan, Title,
    },
    services::{
        assessor,
        lifecycle::{self, LedgerEffect, LoanAction, LoanRules},
    },
};

#[derive(Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    titles: BTreeMap<i64, Title>,
    borrowers: BTreeMap<i64, Borrower>,
    loans: BTreeMap<i64, Loan>,
    fines: BTreeMap<i64, Fine>,
    title_ids: Sequence,
    borrower_ids: Sequence,
    loan_ids: Sequence,
    fine_ids: Sequence,
}

impl MemoryState {
    fn title_mut(&mut self, id: i64) -> AppResult<&mut Title> {
        self.titles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))
    }

    fn title(&self, id: i64) -> AppResult<&Title> {
        self.titles
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Title with id {} not found", id)))
    }

    fn loan(&self, id: i64) -> AppResult<&Loan> {
        self.loans
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    fn fine(&self, id: i64) -> AppResult<&Fine> {
        self.fines
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    fn reserve_copy(&mut self, title_id: i64, at: DateTime<Utc>) -> AppResult<Reservation> {
        let title = self.title_mut(title_id)?;
        let reservation = title.reserve()?;
        title.updated_at = at;
        Ok(reservation)
    }

    fn release_copy(&mut self, title_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let title = self.title_mut(title_id)?;
        title.release()?;
        title.updated_at = at;
        Ok(())
    }

    fn has_active_loan(&self, borrower_id: i64, title_id: i64) -> bool {
        self.loans
            .values()
            .any(|l| l.borrower_id == borrower_id && l.title_id == title_id && l.status.holds_copy())
    }

    fn has_unpaid_fine(&self, loan_id: i64) -> bool {
        self.fines
            .values()
            .any(|f| f.loan_id == loan_id && f.status == FineStatus::Unpaid)
    }

    fn insert_fine(&mut self, fine: NewFine, at: DateTime<Utc>) -> Fine {
        let fine = fine.into_fine(self.fine_ids.next(), at);
        self.fines.insert(fine.id, fine.clone());
        fine
    }
}

/// Store keeping everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CirculationStore for MemoryStore {
    async fn create_title(&self, title: &CreateTitle, at: DateTime<Utc>) -> AppResult<Title> {
        if title.total_copies < 0 {
            return Err(AppError::Validation("totalCopies cannot be negative".to_string()));
        }
        let mut state = self.state.write().await;
        let title = Title {
            id: state.title_ids.next(),
            name: title.name.clone(),
            author: title.author.clone(),
            isbn: title.isbn.clone(),
            total_copies: title.total_copies,
            available_copies: title.total_copies,
            created_at: at,
            updated_at: at,
        };
        state.titles.insert(title.id, title.clone());
        Ok(title)
    }

    async fn get_title(&self, id: i64) -> AppResult<Title> {
        self.state.read().await.title(id).cloned()
    }

    async fn list_titles(&self) -> AppResult<Vec<Title>> {
        Ok(self.state.read().await.titles.values().cloned().collect())
    }

    async fn resize_title(&self, id: i64, total_copies: i32, at: DateTime<Utc>) -> AppResult<Title> {
        let mut state = self.state.write().await;
        let title = state.title_mut(id)?;
        title.resize(total_copies)?;
        title.updated_at = at;
        Ok(title.clone())
    }

    async fn create_borrower(&self, borrower: &CreateBorrower, at: DateTime<Utc>) -> AppResult<Borrower> {
        let mut state = self.state.write().await;
        let borrower = Borrower {
            id: state.borrower_ids.next(),
            display_name: borrower.display_name.clone(),
            email: borrower.email.clone(),
            role: borrower.role,
            created_at: at,
        };
        state.borrowers.insert(borrower.id, borrower.clone());
        Ok(borrower)
    }

    async fn get_borrower(&self, id: i64) -> AppResult<Borrower> {
        self.state
            .read()
            .await
            .borrowers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    async fn list_borrowers(&self) -> AppResult<Vec<Borrower>> {
        Ok(self.state.read().await.borrowers.values().cloned().collect())
    }

    async fn create_loan(&self, request: &BorrowRequest, rules: &LoanRules, at: DateTime<Utc>) -> AppResult<BorrowOutcome> {
        let mut state = self.state.write().await;

        if !state.borrowers.contains_key(&request.borrower_id) {
            return Err(AppError::NotFound(format!(
                "Borrower with id {} not found",
                request.borrower_id
            )));
        }
        state.title(request.title_id)?;

        let has_active = state.has_active_loan(request.borrower_id, request.title_id);
        lifecycle::check_borrow(request, has_active, rules)?;

        let reservation = state.reserve_copy(request.title_id, at)?;
        let loan = NewLoan::from_reservation(reservation, request).into_loan(state.loan_ids.next(), at);
        state.loans.insert(loan.id, loan.clone());

        let title = state.title(request.title_id)?.clone();
        Ok(BorrowOutcome { loan, title })
    }

    async fn apply_transition(
        &self,
        loan_id: i64,
        action: &LoanAction,
        rules: &LoanRules,
        at: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let mut state = self.state.write().await;

        let current = state.loan(loan_id)?.clone();
        let plan = lifecycle::plan_transition(&current, action, rules, at)?;

        if plan.ledger == LedgerEffect::Release {
            state.release_copy(current.title_id, at)?;
        }

        let (fine, skipped_fine) = match plan.fine {
            Some(fine) if state.has_unpaid_fine(loan_id) => {
                tracing::warn!(loan_id, amount = %fine.amount, "Loan already has an unpaid fine, skipping automatic assessment");
                (None, Some(fine))
            }
            Some(fine) => (Some(state.insert_fine(fine, at)), None),
            None => (None, None),
        };

        state.loans.insert(loan_id, plan.loan.clone());
        let title = state.title(current.title_id)?.clone();

        Ok(TransitionOutcome {
            from: plan.from,
            loan: plan.loan,
            title,
            fine,
            skipped_fine,
        })
    }

    async fn get_loan(&self, id: i64) -> AppResult<Loan> {
        self.state.read().await.loan(id).cloned()
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .filter(|l| query.borrower_id.map_or(true, |id| l.borrower_id == id))
            .filter(|l| query.title_id.map_or(true, |id| l.title_id == id))
            .cloned()
            .collect())
    }

    async fn create_fine(&self, request: &CreateFine, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut state = self.state.write().await;

        let loan = state.loan(request.loan_id)?.clone();
        let fine = assessor::manual_fine(&loan, request, at)?;
        if state.has_unpaid_fine(loan.id) {
            return Err(AppError::Conflict(format!("Loan {} already has an unpaid fine", loan.id)));
        }
        Ok(state.insert_fine(fine, at))
    }

    async fn update_fine(&self, id: i64, update: &UpdateFine, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut state = self.state.write().await;

        let mut fine = state.fine(id)?.clone();
        fine.apply_update(update)?;
        let loan = state.loan(fine.loan_id)?;
        assessor::validate_fine_amounts(loan, fine.amount, fine.days_overdue, at)?;

        state.fines.insert(id, fine.clone());
        Ok(fine)
    }

    async fn mark_fine_paid(&self, id: i64, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut state = self.state.write().await;
        let fine = state
            .fines
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))?;
        fine.mark_paid(at)?;
        Ok(fine.clone())
    }

    async fn get_fine(&self, id: i64) -> AppResult<Fine> {
        self.state.read().await.fine(id).cloned()
    }

    async fn list_fines(&self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let state = self.state.read().await;
        Ok(state
            .fines
            .values()
            .filter(|f| query.status.map_or(true, |s| f.status == s))
            .filter(|f| query.borrower_id.map_or(true, |id| f.borrower_id == id))
            .filter(|f| query.loan_id.map_or(true, |id| f.loan_id == id))
            .cloned()
            .collect())
    }

    async fn snapshot(&self) -> AppResult<HistorySnapshot> {
        let state = self.state.read().await;
        Ok(HistorySnapshot {
            titles: state.titles.values().cloned().collect(),
            loans: state.loans.values().cloned().collect(),
            borrowers: state.borrowers.values().cloned().collect(),
            fines: state.fines.values().cloned().collect(),
        })
    }
}
