//! Error types for the circulation server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NotFound = 4,
    OutOfStock = 7,
    Duplicate = 8,
    DuplicateActiveLoan = 11,
    InvalidTransition = 12,
    BadValue = 18,
    InvariantViolation = 30,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Duplicate active loan: {0}")]
    DuplicateActiveLoan(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build an invariant violation and report it for operator attention.
    ///
    /// These never come from user input; they mean an upstream bug
    /// (double release, corrupted row) and are never corrected silently.
    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: "circulation::invariant", "Invariant violation: {}", message);
        AppError::InvariantViolation(message)
    }

    /// Error code for this error kind
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::OutOfStock(_) => ErrorCode::OutOfStock,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::DuplicateActiveLoan(_) => ErrorCode::DuplicateActiveLoan,
            AppError::InvariantViolation(_) => ErrorCode::InvariantViolation,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// Error kind name exposed to clients (`OutOfStock`, `InvalidTransition`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::OutOfStock(_) => "OutOfStock",
            AppError::InvalidTransition(_) => "InvalidTransition",
            AppError::DuplicateActiveLoan(_) => "DuplicateActiveLoan",
            AppError::InvariantViolation(_) => "InvariantViolation",
            AppError::Validation(_) => "Validation",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Conflict(_) => "Conflict",
            AppError::Database(_) => "Database",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::OutOfStock(msg)
            | AppError::InvalidTransition(msg)
            | AppError::DuplicateActiveLoan(msg)
            | AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::InvariantViolation(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: self.code() as u32,
            error: self.kind().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
