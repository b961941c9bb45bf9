//! Notification events produced by loan and fine transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    LoanRequested,
    LoanApproved,
    LoanRejected,
    ReturnRequested,
    LoanReturned,
    ReturnRejected,
    FineIssued,
    FinePaid,
}

/// One event for external delivery (mail, push, in-app inbox)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    /// Borrower the event concerns
    pub borrower_id: i64,
    pub loan_id: Option<i64>,
    pub fine_id: Option<i64>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, borrower_id: i64, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            borrower_id,
            loan_id: None,
            fine_id: None,
            message: message.into(),
            created_at: at,
        }
    }

    pub fn for_loan(mut self, loan_id: i64) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn for_fine(mut self, fine_id: i64) -> Self {
        self.fine_id = Some(fine_id);
        self
    }
}
