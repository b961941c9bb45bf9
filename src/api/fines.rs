//! Fine endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::{AppJson, AppPath, AppQuery, OptionalJson};
use crate::{
    error::AppResult,
    models::{
        fine::{CreateFine, FineQuery, PayFine, UpdateFine},
        Fine,
    },
    AppState,
};

/// Issue a manual fine on a loan
#[utoipa::path(
    post,
    path = "/fine",
    tag = "fines",
    request_body = CreateFine,
    responses(
        (status = 201, description = "Fine created", body = Fine),
        (status = 400, description = "Invalid amount or overdue days", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan already has an unpaid fine", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_fine(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateFine>,
) -> AppResult<(StatusCode, Json<Fine>)> {
    let fine = state.services.fines.create(request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(fine)))
}

/// Edit an unpaid fine
#[utoipa::path(
    patch,
    path = "/fine/{id}",
    tag = "fines",
    params(("id" = i64, Path, description = "Fine ID")),
    request_body = UpdateFine,
    responses(
        (status = 200, description = "Fine updated", body = Fine),
        (status = 400, description = "Invalid amount or overdue days", body = crate::error::ErrorResponse),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Fine is already paid", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_fine(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<UpdateFine>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.update(id, update, Utc::now()).await?;
    Ok(Json(fine))
}

/// Mark a fine as paid
#[utoipa::path(
    patch,
    path = "/fine/{id}/pay",
    tag = "fines",
    params(("id" = i64, Path, description = "Fine ID")),
    request_body(content = PayFine, description = "Optional payment date"),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Fine is already paid", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    OptionalJson(body): OptionalJson<PayFine>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.pay(id, body.paid_at, Utc::now()).await?;
    Ok(Json(fine))
}

/// Get one fine
#[utoipa::path(
    get,
    path = "/fine/{id}",
    tag = "fines",
    params(("id" = i64, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine", body = Fine),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_fine(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.get(id).await?;
    Ok(Json(fine))
}

/// List fines, newest first
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    params(FineQuery),
    responses(
        (status = 200, description = "Fines", body = Vec<Fine>)
    )
)]
pub async fn list_fines(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FineQuery>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.fines.list(&query).await?;
    Ok(Json(fines))
}
