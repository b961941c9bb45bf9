//! Loans table access

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{LoanQuery, LoanRow, NewLoan},
        Loan, LoanStatus,
    },
};

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Loan with id {} not found", id))
}

fn decode(rows: Vec<LoanRow>) -> AppResult<Vec<Loan>> {
    rows.into_iter().map(Loan::try_from).collect()
}

pub async fn insert(conn: &mut PgConnection, loan: NewLoan, at: DateTime<Utc>) -> AppResult<Loan> {
    let row = sqlx::query_as::<_, LoanRow>(
        r#"
        INSERT INTO loans (title_id, borrower_id, borrow_date, requested_due_date, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(loan.title_id)
    .bind(loan.borrower_id)
    .bind(loan.borrow_date)
    .bind(loan.requested_due_date)
    .bind(LoanStatus::Pending.as_str())
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

pub async fn fetch(conn: &mut PgConnection, id: i64) -> AppResult<Loan> {
    sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// Fetch a loan and hold its row lock until the transaction ends
pub async fn lock(conn: &mut PgConnection, id: i64) -> AppResult<Loan> {
    sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// Whether the borrower holds a non-terminal loan on the title
pub async fn has_active(conn: &mut PgConnection, borrower_id: i64, title_id: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM loans
            WHERE borrower_id = $1 AND title_id = $2
              AND status IN ('PENDING', 'APPROVED', 'RETURN_REQUESTED')
        )
        "#,
    )
    .bind(borrower_id)
    .bind(title_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

pub async fn list(conn: &mut PgConnection, query: &LoanQuery) -> AppResult<Vec<Loan>> {
    let rows = sqlx::query_as::<_, LoanRow>(
        r#"
        SELECT * FROM loans
        WHERE ($1::BIGINT IS NULL OR borrower_id = $1)
          AND ($2::BIGINT IS NULL OR title_id = $2)
        ORDER BY id
        "#,
    )
    .bind(query.borrower_id)
    .bind(query.title_id)
    .fetch_all(&mut *conn)
    .await?;

    decode(rows)
}

/// Write `loan` only if the stored status is still `expected`.
///
/// A miss means another writer moved the loan first and is reported as an
/// invalid transition carrying the status it moved to.
pub async fn compare_and_set(conn: &mut PgConnection, expected: LoanStatus, loan: &Loan) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE loans
        SET status = $1, due_date = $2, return_requested_at = $3, return_date = $4, updated_at = $5
        WHERE id = $6 AND status = $7
        "#,
    )
    .bind(loan.status.as_str())
    .bind(loan.due_date)
    .bind(loan.return_requested_at)
    .bind(loan.return_date)
    .bind(loan.updated_at)
    .bind(loan.id)
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current = fetch(conn, loan.id).await?;
        return Err(AppError::InvalidTransition(format!(
            "Loan {} changed concurrently. Current status: {}",
            loan.id, current.status
        )));
    }
    Ok(())
}
