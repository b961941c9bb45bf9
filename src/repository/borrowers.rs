//! Borrowers table access

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrower::{BorrowerRow, CreateBorrower},
        Borrower,
    },
};

pub async fn insert(conn: &mut PgConnection, borrower: &CreateBorrower, at: DateTime<Utc>) -> AppResult<Borrower> {
    let row = sqlx::query_as::<_, BorrowerRow>(
        r#"
        INSERT INTO borrowers (display_name, email, role, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&borrower.display_name)
    .bind(&borrower.email)
    .bind(borrower.role.as_str())
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

pub async fn fetch(conn: &mut PgConnection, id: i64) -> AppResult<Borrower> {
    sqlx::query_as::<_, BorrowerRow>("SELECT * FROM borrowers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))?
        .try_into()
}

pub async fn list(conn: &mut PgConnection) -> AppResult<Vec<Borrower>> {
    sqlx::query_as::<_, BorrowerRow>("SELECT * FROM borrowers ORDER BY id")
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Borrower::try_from)
        .collect()
}
