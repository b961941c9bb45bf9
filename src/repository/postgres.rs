//! PostgreSQL store
//!
//! Each operation runs in one transaction. Transitions lock the loan row
//! first and the title row second; borrows lock only the title row, so the
//! lock order is the same everywhere and concurrent writers queue instead
//! of deadlocking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{borrowers, fines, loans, titles, BorrowOutcome, CirculationStore, TransitionOutcome};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    models::{
        borrower::CreateBorrower,
        fine::{CreateFine, FineQuery, UpdateFine},
        loan::{BorrowRequest, LoanQuery, NewLoan},
        stats::HistorySnapshot,
        title::CreateTitle,
        Borrower, Fine, Loan, Title,
    },
    services::{
        assessor,
        lifecycle::{self, LedgerEffect, LoanAction, LoanRules},
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }
}

#[async_trait]
impl CirculationStore for PgStore {
    async fn create_title(&self, title: &CreateTitle, at: DateTime<Utc>) -> AppResult<Title> {
        let mut conn = self.pool.acquire().await?;
        titles::insert(&mut conn, title, at).await
    }

    async fn get_title(&self, id: i64) -> AppResult<Title> {
        let mut conn = self.pool.acquire().await?;
        titles::fetch(&mut conn, id).await
    }

    async fn list_titles(&self) -> AppResult<Vec<Title>> {
        let mut conn = self.pool.acquire().await?;
        titles::list(&mut conn).await
    }

    async fn resize_title(&self, id: i64, total_copies: i32, at: DateTime<Utc>) -> AppResult<Title> {
        let mut tx = self.pool.begin().await?;

        let mut title = titles::lock(&mut tx, id).await?;
        title.resize(total_copies)?;
        title.updated_at = at;
        titles::store_counters(&mut tx, &title).await?;

        tx.commit().await?;
        Ok(title)
    }

    async fn create_borrower(&self, borrower: &CreateBorrower, at: DateTime<Utc>) -> AppResult<Borrower> {
        let mut conn = self.pool.acquire().await?;
        borrowers::insert(&mut conn, borrower, at).await
    }

    async fn get_borrower(&self, id: i64) -> AppResult<Borrower> {
        let mut conn = self.pool.acquire().await?;
        borrowers::fetch(&mut conn, id).await
    }

    async fn list_borrowers(&self) -> AppResult<Vec<Borrower>> {
        let mut conn = self.pool.acquire().await?;
        borrowers::list(&mut conn).await
    }

    async fn create_loan(&self, request: &BorrowRequest, rules: &LoanRules, at: DateTime<Utc>) -> AppResult<BorrowOutcome> {
        let mut tx = self.pool.begin().await?;

        borrowers::fetch(&mut tx, request.borrower_id).await?;
        let mut title = titles::lock(&mut tx, request.title_id).await?;

        let has_active = loans::has_active(&mut tx, request.borrower_id, request.title_id).await?;
        lifecycle::check_borrow(request, has_active, rules)?;

        let reservation = title.reserve()?;
        title.updated_at = at;
        titles::store_counters(&mut tx, &title).await?;
        let loan = loans::insert(&mut tx, NewLoan::from_reservation(reservation, request), at).await?;

        tx.commit().await?;
        Ok(BorrowOutcome { loan, title })
    }

    async fn apply_transition(
        &self,
        loan_id: i64,
        action: &LoanAction,
        rules: &LoanRules,
        at: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let current = loans::lock(&mut tx, loan_id).await?;
        let plan = lifecycle::plan_transition(&current, action, rules, at)?;

        let title = match plan.ledger {
            LedgerEffect::Release => {
                let mut title = titles::lock(&mut tx, current.title_id).await?;
                title.release()?;
                title.updated_at = at;
                titles::store_counters(&mut tx, &title).await?;
                title
            }
            LedgerEffect::Keep => titles::fetch(&mut tx, current.title_id).await?,
        };

        let (fine, skipped_fine) = match plan.fine {
            Some(fine) => {
                if fines::has_unpaid(&mut tx, loan_id).await? {
                    tracing::warn!(loan_id, amount = %fine.amount, "Loan already has an unpaid fine, skipping automatic assessment");
                    (None, Some(fine))
                } else {
                    (Some(fines::insert(&mut tx, fine, at).await?), None)
                }
            }
            None => (None, None),
        };

        loans::compare_and_set(&mut tx, current.status, &plan.loan).await?;

        tx.commit().await?;
        Ok(TransitionOutcome {
            from: plan.from,
            loan: plan.loan,
            title,
            fine,
            skipped_fine,
        })
    }

    async fn get_loan(&self, id: i64) -> AppResult<Loan> {
        let mut conn = self.pool.acquire().await?;
        loans::fetch(&mut conn, id).await
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let mut conn = self.pool.acquire().await?;
        loans::list(&mut conn, query).await
    }

    async fn create_fine(&self, request: &CreateFine, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut tx = self.pool.begin().await?;

        // The loan lock serializes fine creation per loan
        let loan = loans::lock(&mut tx, request.loan_id).await?;
        let fine = assessor::manual_fine(&loan, request, at)?;
        if fines::has_unpaid(&mut tx, loan.id).await? {
            return Err(AppError::Conflict(format!("Loan {} already has an unpaid fine", loan.id)));
        }
        let fine = fines::insert(&mut tx, fine, at).await?;

        tx.commit().await?;
        Ok(fine)
    }

    async fn update_fine(&self, id: i64, update: &UpdateFine, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut tx = self.pool.begin().await?;

        let mut fine = fines::lock(&mut tx, id).await?;
        fine.apply_update(update)?;
        let loan = loans::fetch(&mut tx, fine.loan_id).await?;
        assessor::validate_fine_amounts(&loan, fine.amount, fine.days_overdue, at)?;
        fines::store(&mut tx, &fine).await?;

        tx.commit().await?;
        Ok(fine)
    }

    async fn mark_fine_paid(&self, id: i64, at: DateTime<Utc>) -> AppResult<Fine> {
        let mut tx = self.pool.begin().await?;

        let mut fine = fines::lock(&mut tx, id).await?;
        fine.mark_paid(at)?;
        fines::store(&mut tx, &fine).await?;

        tx.commit().await?;
        Ok(fine)
    }

    async fn get_fine(&self, id: i64) -> AppResult<Fine> {
        let mut conn = self.pool.acquire().await?;
        fines::fetch(&mut conn, id).await
    }

    async fn list_fines(&self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let mut conn = self.pool.acquire().await?;
        fines::list(&mut conn, query).await
    }

    async fn snapshot(&self) -> AppResult<HistorySnapshot> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let snapshot = HistorySnapshot {
            titles: titles::list(&mut tx).await?,
            loans: loans::list(&mut tx, &LoanQuery::default()).await?,
            borrowers: borrowers::list(&mut tx).await?,
            fines: fines::list(&mut tx, &FineQuery::default()).await?,
        };

        tx.commit().await?;
        Ok(snapshot)
    }
}
