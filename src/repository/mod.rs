//! Repository layer
//!
//! `CirculationStore` is the storage seam of the engine. Each method is one
//! atomic unit: status checks, copy counters and fine inserts either all
//! commit or none do, and no reader sees an intermediate state.

pub mod borrowers;
pub mod fines;
pub mod loans;
pub mod memory;
pub mod postgres;
pub mod titles;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        borrower::CreateBorrower,
        fine::{CreateFine, FineQuery, NewFine, UpdateFine},
        loan::{BorrowRequest, LoanQuery},
        stats::HistorySnapshot,
        title::CreateTitle,
        Borrower, Fine, Loan, LoanStatus, Title,
    },
    services::lifecycle::{LoanAction, LoanRules},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle on the configured store
pub type Store = Arc<dyn CirculationStore>;

/// Committed result of a loan transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// Status the loan was in when the transition committed
    pub from: LoanStatus,
    pub loan: Loan,
    /// Title after any copy release
    pub title: Title,
    /// Fine created by the transition, if any
    pub fine: Option<Fine>,
    /// Late fee assessed but not stored because the loan already had an unpaid fine
    pub skipped_fine: Option<NewFine>,
}

/// Result of a borrow request
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowOutcome {
    pub loan: Loan,
    /// Title after the reservation
    pub title: Title,
}

#[async_trait]
pub trait CirculationStore: Send + Sync {
    // Catalog
    async fn create_title(&self, title: &CreateTitle, at: DateTime<Utc>) -> AppResult<Title>;
    async fn get_title(&self, id: i64) -> AppResult<Title>;
    async fn list_titles(&self) -> AppResult<Vec<Title>>;
    /// Change the owned copy count without touching copies on loan
    async fn resize_title(&self, id: i64, total_copies: i32, at: DateTime<Utc>) -> AppResult<Title>;

    // Borrowers
    async fn create_borrower(&self, borrower: &CreateBorrower, at: DateTime<Utc>) -> AppResult<Borrower>;
    async fn get_borrower(&self, id: i64) -> AppResult<Borrower>;
    async fn list_borrowers(&self) -> AppResult<Vec<Borrower>>;

    // Loans
    /// Reserve a copy and create a PENDING loan backed by it
    async fn create_loan(&self, request: &BorrowRequest, rules: &LoanRules, at: DateTime<Utc>) -> AppResult<BorrowOutcome>;
    /// Plan and commit `action` against the loan's status at commit time
    async fn apply_transition(
        &self,
        loan_id: i64,
        action: &LoanAction,
        rules: &LoanRules,
        at: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome>;
    async fn get_loan(&self, id: i64) -> AppResult<Loan>;
    /// Loans matching the stored-field filters of `query` (status is applied by callers)
    async fn list_loans(&self, query: &LoanQuery) -> AppResult<Vec<Loan>>;

    // Fines
    async fn create_fine(&self, request: &CreateFine, at: DateTime<Utc>) -> AppResult<Fine>;
    async fn update_fine(&self, id: i64, update: &UpdateFine, at: DateTime<Utc>) -> AppResult<Fine>;
    async fn mark_fine_paid(&self, id: i64, at: DateTime<Utc>) -> AppResult<Fine>;
    async fn get_fine(&self, id: i64) -> AppResult<Fine>;
    async fn list_fines(&self, query: &FineQuery) -> AppResult<Vec<Fine>>;

    /// Consistent read of the whole history for aggregation
    async fn snapshot(&self) -> AppResult<HistorySnapshot>;
}
