//! Title and borrower endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::{AppJson, AppPath};
use crate::{
    error::AppResult,
    models::{
        borrower::CreateBorrower,
        title::{CreateTitle, UpdateCopies},
        Borrower, Title,
    },
    AppState,
};

/// Add a title to the catalog
#[utoipa::path(
    post,
    path = "/titles",
    tag = "catalog",
    request_body = CreateTitle,
    responses(
        (status = 201, description = "Title created with all copies available", body = Title),
        (status = 400, description = "Invalid title", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_title(
    State(state): State<AppState>,
    AppJson(title): AppJson<CreateTitle>,
) -> AppResult<(StatusCode, Json<Title>)> {
    let title = state.services.catalog.create_title(title, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// List titles
#[utoipa::path(
    get,
    path = "/titles",
    tag = "catalog",
    responses(
        (status = 200, description = "Titles with copy counters", body = Vec<Title>)
    )
)]
pub async fn list_titles(State(state): State<AppState>) -> AppResult<Json<Vec<Title>>> {
    let titles = state.services.catalog.list_titles().await?;
    Ok(Json(titles))
}

/// Get one title
#[utoipa::path(
    get,
    path = "/titles/{id}",
    tag = "catalog",
    params(("id" = i64, Path, description = "Title ID")),
    responses(
        (status = 200, description = "Title", body = Title),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_title(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<Title>> {
    let title = state.services.catalog.get_title(id).await?;
    Ok(Json(title))
}

/// Change the number of owned copies
#[utoipa::path(
    put,
    path = "/titles/{id}/copies",
    tag = "catalog",
    params(("id" = i64, Path, description = "Title ID")),
    request_body = UpdateCopies,
    responses(
        (status = 200, description = "Title resized", body = Title),
        (status = 400, description = "Fewer copies than are on loan", body = crate::error::ErrorResponse),
        (status = 404, description = "Title not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_copies(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<UpdateCopies>,
) -> AppResult<Json<Title>> {
    let title = state.services.catalog.update_copies(id, update, Utc::now()).await?;
    Ok(Json(title))
}

/// Register a borrower
#[utoipa::path(
    post,
    path = "/borrowers",
    tag = "catalog",
    request_body = CreateBorrower,
    responses(
        (status = 201, description = "Borrower created", body = Borrower),
        (status = 400, description = "Invalid borrower", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrower(
    State(state): State<AppState>,
    AppJson(borrower): AppJson<CreateBorrower>,
) -> AppResult<(StatusCode, Json<Borrower>)> {
    let borrower = state.services.catalog.create_borrower(borrower, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(borrower)))
}

/// List borrowers
#[utoipa::path(
    get,
    path = "/borrowers",
    tag = "catalog",
    responses(
        (status = 200, description = "Borrowers", body = Vec<Borrower>)
    )
)]
pub async fn list_borrowers(State(state): State<AppState>) -> AppResult<Json<Vec<Borrower>>> {
    let borrowers = state.services.catalog.list_borrowers().await?;
    Ok(Json(borrowers))
}

/// Get one borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}",
    tag = "catalog",
    params(("id" = i64, Path, description = "Borrower ID")),
    responses(
        (status = 200, description = "Borrower", body = Borrower),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrower(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<Borrower>> {
    let borrower = state.services.catalog.get_borrower(id).await?;
    Ok(Json(borrower))
}
