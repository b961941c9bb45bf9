//! Title (catalog entry) model and the copy ledger rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Catalog entry with its copy counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: i32,
    /// Always within `0..=total_copies`
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Proof that one copy of a title was taken out of the available pool.
///
/// Only [`Title::reserve`] creates one, and a pending loan can only be
/// built by consuming one.
#[must_use = "a reservation must back a new loan"]
#[derive(Debug)]
pub struct Reservation {
    title_id: i64,
}

impl Reservation {
    pub fn title_id(&self) -> i64 {
        self.title_id
    }
}

impl Title {
    /// Copies currently backing a non-terminal loan
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Take one copy out of the available pool
    pub fn reserve(&mut self) -> AppResult<Reservation> {
        self.check_bounds()?;
        if self.available_copies == 0 {
            return Err(AppError::OutOfStock(format!(
                "No copies of \"{}\" are available ({} of {} on loan)",
                self.name,
                self.on_loan(),
                self.total_copies
            )));
        }
        self.available_copies -= 1;
        Ok(Reservation { title_id: self.id })
    }

    /// Give one copy back to the available pool
    pub fn release(&mut self) -> AppResult<()> {
        self.check_bounds()?;
        if self.available_copies >= self.total_copies {
            return Err(AppError::invariant(format!(
                "Release of title {} would exceed its {} total copies",
                self.id, self.total_copies
            )));
        }
        self.available_copies += 1;
        Ok(())
    }

    /// Change the number of owned copies, keeping the copies on loan intact
    pub fn resize(&mut self, total_copies: i32) -> AppResult<()> {
        self.check_bounds()?;
        if total_copies < 0 {
            return Err(AppError::Validation("totalCopies cannot be negative".to_string()));
        }
        let on_loan = self.on_loan();
        if total_copies < on_loan {
            return Err(AppError::Validation(format!(
                "Cannot reduce title {} to {} copies: {} are on loan",
                self.id, total_copies, on_loan
            )));
        }
        self.available_copies = total_copies - on_loan;
        self.total_copies = total_copies;
        Ok(())
    }

    fn check_bounds(&self) -> AppResult<()> {
        if self.available_copies < 0 || self.available_copies > self.total_copies {
            return Err(AppError::invariant(format!(
                "Title {} has {} available copies out of {}",
                self.id, self.available_copies, self.total_copies
            )));
        }
        Ok(())
    }
}

/// Create title request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTitle {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "totalCopies cannot be negative"))]
    pub total_copies: i32,
}

/// Update copy count request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCopies {
    #[validate(range(min = 0, message = "totalCopies cannot be negative"))]
    pub total_copies: i32,
}
