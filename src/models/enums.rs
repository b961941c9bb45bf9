//! Shared domain enums
//!
//! Statuses are persisted as their upper-case text form.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle status.
///
/// `Overdue` is never stored: it is derived at read time from an `Approved`
/// loan whose due date has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    ReturnRequested,
    Returned,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::ReturnRequested => "RETURN_REQUESTED",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::Overdue => "OVERDUE",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Returned)
    }

    /// A non-terminal loan still holds its reserved copy
    pub fn holds_copy(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(LoanStatus::Pending),
            "APPROVED" => Ok(LoanStatus::Approved),
            "REJECTED" => Ok(LoanStatus::Rejected),
            "RETURN_REQUESTED" => Ok(LoanStatus::ReturnRequested),
            "RETURNED" => Ok(LoanStatus::Returned),
            "OVERDUE" => Ok(LoanStatus::Overdue),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// FineStatus
// ---------------------------------------------------------------------------

/// Fine payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineStatus {
    Unpaid,
    Paid,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Unpaid => "UNPAID",
            FineStatus::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for FineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Ok(FineStatus::Unpaid),
            "PAID" => Ok(FineStatus::Paid),
            _ => Err(format!("Invalid fine status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// BorrowerRole
// ---------------------------------------------------------------------------

/// Borrower role. Only used to segment statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowerRole {
    General,
    Student,
    Staff,
}

impl BorrowerRole {
    pub const ALL: [BorrowerRole; 3] = [BorrowerRole::General, BorrowerRole::Student, BorrowerRole::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowerRole::General => "general",
            BorrowerRole::Student => "student",
            BorrowerRole::Staff => "staff",
        }
    }
}

impl Default for BorrowerRole {
    fn default() -> Self {
        BorrowerRole::General
    }
}

impl std::fmt::Display for BorrowerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(BorrowerRole::General),
            "student" => Ok(BorrowerRole::Student),
            "staff" => Ok(BorrowerRole::Staff),
            _ => Err(format!("Invalid borrower role: {}", s)),
        }
    }
}
