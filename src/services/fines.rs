//! Fine management service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use super::{assessor::FinePolicy, loans::fine_issued, notifications::NotificationSink};
use crate::{
    error::AppResult,
    models::{
        fine::{CreateFine, FineQuery, UpdateFine},
        notification::{Notification, NotificationKind},
        Fine,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct FinesService {
    store: Store,
    policy: FinePolicy,
    notifier: Arc<dyn NotificationSink>,
}

impl FinesService {
    pub fn new(store: Store, policy: FinePolicy, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, policy, notifier }
    }

    /// Record a fine entered by a librarian
    pub async fn create(&self, request: CreateFine, now: DateTime<Utc>) -> AppResult<Fine> {
        request.validate()?;
        let fine = self.store.create_fine(&request, now).await?;

        tracing::info!(fine_id = fine.id, loan_id = fine.loan_id, amount = %fine.amount, "Fine issued");
        self.notifier.publish(fine_issued(&fine, &self.policy, now));
        Ok(fine)
    }

    /// Edit an unpaid fine
    pub async fn update(&self, id: i64, update: UpdateFine, now: DateTime<Utc>) -> AppResult<Fine> {
        update.validate()?;
        let fine = self.store.update_fine(id, &update, now).await?;
        tracing::info!(fine_id = id, amount = %fine.amount, "Fine updated");
        Ok(fine)
    }

    /// Settle an unpaid fine
    pub async fn pay(&self, id: i64, paid_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<Fine> {
        let fine = self.store.mark_fine_paid(id, paid_at.unwrap_or(now)).await?;

        tracing::info!(fine_id = id, loan_id = fine.loan_id, "Fine paid");
        self.notifier.publish(
            Notification::new(
                NotificationKind::FinePaid,
                fine.borrower_id,
                format!("Payment of {} received", self.policy.format_amount(fine.amount)),
                now,
            )
            .for_loan(fine.loan_id)
            .for_fine(fine.id),
        );
        Ok(fine)
    }

    pub async fn get(&self, id: i64) -> AppResult<Fine> {
        self.store.get_fine(id).await
    }

    /// Fines matching `query`, newest first
    pub async fn list(&self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let mut fines = self.store.list_fines(query).await?;
        fines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(fines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{
            borrower::CreateBorrower, loan::BorrowRequest, title::CreateTitle, BorrowerRole, FineStatus,
        },
        repository::{CirculationStore, MemoryStore},
        services::{
            lifecycle::{LoanAction, LoanRules},
            notifications::MockNotificationSink,
        },
    };
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap()
    }

    /// Store holding one loan approved at `t0` and due 14 days later
    async fn approved_loan() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let title = CreateTitle {
            name: "Kindred".to_string(),
            author: Some("Octavia E. Butler".to_string()),
            isbn: None,
            total_copies: 1,
        };
        store.create_title(&title, t0()).await.unwrap();
        let borrower = CreateBorrower {
            display_name: "Noor".to_string(),
            email: Some("noor@example.org".to_string()),
            role: BorrowerRole::General,
        };
        store.create_borrower(&borrower, t0()).await.unwrap();
        let request = BorrowRequest {
            title_id: 1,
            borrower_id: 1,
            borrow_date: t0(),
            due_date: None,
        };
        let rules = LoanRules::default();
        store.create_loan(&request, &rules, t0()).await.unwrap();
        store
            .apply_transition(1, &LoanAction::Approve { due_date: None }, &rules, t0())
            .await
            .unwrap();
        store
    }

    fn request(amount: i64, days: i32) -> CreateFine {
        CreateFine {
            loan_id: 1,
            amount: Decimal::new(amount, 2),
            reason: "Kept past due date".to_string(),
            days_overdue: days,
        }
    }

    #[tokio::test]
    async fn issue_edit_and_pay() {
        let mut sink = MockNotificationSink::new();
        sink.expect_publish()
            .withf(|n| n.kind == NotificationKind::FineIssued && n.message.contains("2.00 EUR"))
            .times(1)
            .return_const(());
        sink.expect_publish()
            .withf(|n| n.kind == NotificationKind::FinePaid)
            .times(1)
            .return_const(());
        let service = FinesService::new(approved_loan().await, LoanRules::default().fine_policy, Arc::new(sink));
        let now = t0() + Duration::days(18);

        let fine = service.create(request(200, 4), now).await.unwrap();
        assert_eq!(fine.status, FineStatus::Unpaid);

        let edited = service
            .update(
                fine.id,
                UpdateFine {
                    amount: Some(Decimal::new(150, 2)),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(edited.amount, Decimal::new(150, 2));

        let paid = service.pay(fine.id, None, now).await.unwrap();
        assert_eq!(paid.status, FineStatus::Paid);
        assert_eq!(paid.paid_at, Some(now));
        assert!(matches!(
            service.pay(fine.id, None, now).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn rejects_fines_beyond_overdue_days() {
        let mut sink = MockNotificationSink::new();
        sink.expect_publish().never();
        let service = FinesService::new(approved_loan().await, LoanRules::default().fine_policy, Arc::new(sink));
        let now = t0() + Duration::days(16);

        assert!(matches!(
            service.create(request(200, 3), now).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(request(200, 0), now).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(request(0, 1), now).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(service.get(1).await, Err(AppError::NotFound(_))));
    }
}
