//! Titles table access

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{title::CreateTitle, Title},
};

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Title with id {} not found", id))
}

pub async fn insert(conn: &mut PgConnection, title: &CreateTitle, at: DateTime<Utc>) -> AppResult<Title> {
    let title = sqlx::query_as::<_, Title>(
        r#"
        INSERT INTO titles (name, author, isbn, total_copies, available_copies, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4, $5, $5)
        RETURNING *
        "#,
    )
    .bind(&title.name)
    .bind(&title.author)
    .bind(&title.isbn)
    .bind(title.total_copies)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(title)
}

pub async fn fetch(conn: &mut PgConnection, id: i64) -> AppResult<Title> {
    sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Fetch a title and hold its row lock until the transaction ends
pub async fn lock(conn: &mut PgConnection, id: i64) -> AppResult<Title> {
    sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn list(conn: &mut PgConnection) -> AppResult<Vec<Title>> {
    let titles = sqlx::query_as::<_, Title>("SELECT * FROM titles ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(titles)
}

/// Persist the copy counters of a locked title.
///
/// The table's bounds check rejects anything outside `0..=total`; that is
/// reported as an invariant violation since the model checks first.
pub async fn store_counters(conn: &mut PgConnection, title: &Title) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE titles
        SET total_copies = $1, available_copies = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(title.total_copies)
    .bind(title.available_copies)
    .bind(title.updated_at)
    .bind(title.id)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 1 => Ok(()),
        Ok(_) => Err(not_found(title.id)),
        Err(sqlx::Error::Database(e)) if e.is_check_violation() => Err(AppError::invariant(format!(
            "Counters {}/{} rejected for title {}",
            title.available_copies, title.total_copies, title.id
        ))),
        Err(e) => Err(e.into()),
    }
}
