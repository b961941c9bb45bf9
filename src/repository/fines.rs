//! Fines table access

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::{FineQuery, FineRow, NewFine},
        Fine, FineStatus,
    },
};

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Fine with id {} not found", id))
}

pub async fn insert(conn: &mut PgConnection, fine: NewFine, at: DateTime<Utc>) -> AppResult<Fine> {
    let result = sqlx::query_as::<_, FineRow>(
        r#"
        INSERT INTO fines (loan_id, title_id, borrower_id, amount, days_overdue, reason, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(fine.loan_id)
    .bind(fine.title_id)
    .bind(fine.borrower_id)
    .bind(fine.amount)
    .bind(fine.days_overdue)
    .bind(&fine.reason)
    .bind(FineStatus::Unpaid.as_str())
    .bind(at)
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(row) => row.try_into(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(format!(
            "Loan {} already has an unpaid fine",
            fine.loan_id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch(conn: &mut PgConnection, id: i64) -> AppResult<Fine> {
    sqlx::query_as::<_, FineRow>("SELECT * FROM fines WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// Fetch a fine and hold its row lock until the transaction ends
pub async fn lock(conn: &mut PgConnection, id: i64) -> AppResult<Fine> {
    sqlx::query_as::<_, FineRow>("SELECT * FROM fines WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

pub async fn has_unpaid(conn: &mut PgConnection, loan_id: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM fines WHERE loan_id = $1 AND status = 'UNPAID')")
        .bind(loan_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

pub async fn list(conn: &mut PgConnection, query: &FineQuery) -> AppResult<Vec<Fine>> {
    sqlx::query_as::<_, FineRow>(
        r#"
        SELECT * FROM fines
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::BIGINT IS NULL OR borrower_id = $2)
          AND ($3::BIGINT IS NULL OR loan_id = $3)
        ORDER BY id
        "#,
    )
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.borrower_id)
    .bind(query.loan_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Fine::try_from)
    .collect()
}

/// Persist the editable fields and payment state of a locked fine
pub async fn store(conn: &mut PgConnection, fine: &Fine) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE fines
        SET amount = $1, days_overdue = $2, reason = $3, status = $4, paid_at = $5
        WHERE id = $6
        "#,
    )
    .bind(fine.amount)
    .bind(fine.days_overdue)
    .bind(&fine.reason)
    .bind(fine.status.as_str())
    .bind(fine.paid_at)
    .bind(fine.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(fine.id));
    }
    Ok(())
}
