//! Loan lifecycle endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::{AppJson, AppPath, AppQuery, OptionalJson};
use crate::{
    error::AppResult,
    models::loan::{ApproveLoan, ApproveReturn, BorrowRequest, LoanDetails, LoanOutcome, LoanQuery, RequestReturn},
    AppState,
};

/// Request to borrow a title
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "loans",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Pending loan created, one copy reserved", body = LoanOutcome),
        (status = 400, description = "Invalid dates", body = crate::error::ErrorResponse),
        (status = 404, description = "Title or borrower not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Out of stock or duplicate active loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_borrow(
    State(state): State<AppState>,
    AppJson(request): AppJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<LoanOutcome>)> {
    let outcome = state.services.loans.request_borrow(request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Approve a pending loan
#[utoipa::path(
    patch,
    path = "/loan/{id}/approve",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    request_body(content = ApproveLoan, description = "Optional confirmed due date"),
    responses(
        (status = 200, description = "Loan approved", body = LoanOutcome),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not PENDING", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_loan(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    OptionalJson(body): OptionalJson<ApproveLoan>,
) -> AppResult<Json<LoanOutcome>> {
    let outcome = state.services.loans.approve(id, body.due_date, Utc::now()).await?;
    Ok(Json(outcome))
}

/// Reject a pending loan and release its copy
#[utoipa::path(
    patch,
    path = "/loan/{id}/reject",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan rejected", body = LoanOutcome),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not PENDING", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_loan(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<LoanOutcome>> {
    let outcome = state.services.loans.reject(id, Utc::now()).await?;
    Ok(Json(outcome))
}

/// Announce that a borrowed copy is being handed back
#[utoipa::path(
    patch,
    path = "/loan/{id}/request-return",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    request_body(content = RequestReturn, description = "Optional hand-in date"),
    responses(
        (status = 200, description = "Return requested", body = LoanOutcome),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not APPROVED or OVERDUE", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    OptionalJson(body): OptionalJson<RequestReturn>,
) -> AppResult<Json<LoanOutcome>> {
    let outcome = state.services.loans.request_return(id, body.requested_at, Utc::now()).await?;
    Ok(Json(outcome))
}

/// Confirm a return, release the copy and assess any late fine
#[utoipa::path(
    patch,
    path = "/loan/{id}/return",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    request_body(content = ApproveReturn, description = "Optional actual return date"),
    responses(
        (status = 200, description = "Loan returned", body = LoanOutcome),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not RETURN_REQUESTED", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    OptionalJson(body): OptionalJson<ApproveReturn>,
) -> AppResult<Json<LoanOutcome>> {
    let outcome = state.services.loans.approve_return(id, body.return_date, Utc::now()).await?;
    Ok(Json(outcome))
}

/// Refuse a return; the loan goes back to APPROVED
#[utoipa::path(
    patch,
    path = "/loan/{id}/reject-return",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Return rejected", body = LoanOutcome),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not RETURN_REQUESTED", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_return(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<LoanOutcome>> {
    let outcome = state.services.loans.reject_return(id, Utc::now()).await?;
    Ok(Json(outcome))
}

/// List loans, most recent activity first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans with their effective status", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list(&query, Utc::now()).await?;
    Ok(Json(loans))
}

/// Get one loan
#[utoipa::path(
    get,
    path = "/loan/{id}",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan with its effective status", body = LoanDetails),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(id, Utc::now()).await?;
    Ok(Json(loan))
}
