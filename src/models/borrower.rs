//! Borrower model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::BorrowerRole;
use crate::error::{AppError, AppResult};

/// Borrower as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrower {
    pub id: i64,
    pub display_name: String,
    pub email: Option<String>,
    pub role: BorrowerRole,
    pub created_at: DateTime<Utc>,
}

/// Internal row structure for database queries (role as text)
#[derive(Debug, Clone, FromRow)]
pub struct BorrowerRow {
    id: i64,
    display_name: String,
    email: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BorrowerRow> for Borrower {
    type Error = AppError;

    fn try_from(row: BorrowerRow) -> AppResult<Self> {
        Ok(Borrower {
            id: row.id,
            display_name: row.display_name,
            email: row.email,
            role: row.role.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
        })
    }
}

/// Create borrower request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrower {
    #[validate(length(min = 1, message = "Display name cannot be empty"))]
    pub display_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    pub role: BorrowerRole,
}
