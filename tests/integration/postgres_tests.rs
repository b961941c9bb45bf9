//! PostgreSQL store tests
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use chrono::{Duration, Utc};

use circulation_server::{
    config::DatabaseConfig,
    error::AppError,
    models::{loan::BorrowRequest, BorrowerRole, LoanStatus},
    repository::{PgStore, Store},
};

use crate::common::{borrower, services, title};

async fn pg_store() -> Store {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        ..Default::default()
    };
    let store = PgStore::connect(&config).await.expect("Failed to connect to database");
    store.migrate().await.expect("Failed to run migrations");
    Arc::new(store)
}

#[tokio::test]
#[ignore]
async fn test_pg_lifecycle_with_fine() {
    let (services, _) = services(pg_store().await);
    let book = title(&services, "Postgres lifecycle", 1).await;
    let a = borrower(&services, "pg-a", BorrowerRole::General).await;
    let b = borrower(&services, "pg-b", BorrowerRole::General).await;

    let borrowed = Utc::now() - Duration::days(20);
    let request = |borrower_id| BorrowRequest {
        title_id: book.id,
        borrower_id,
        borrow_date: borrowed,
        due_date: None,
    };

    let id = services.loans.request_borrow(request(a.id), borrowed).await.unwrap().loan.id;
    services.loans.approve(id, None, borrowed).await.unwrap();
    assert!(matches!(
        services.loans.request_borrow(request(b.id), borrowed).await,
        Err(AppError::OutOfStock(_))
    ));

    let back = borrowed + Duration::days(16);
    services.loans.request_return(id, Some(back), back).await.unwrap();
    let returned = services.loans.approve_return(id, None, back).await.unwrap();

    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert_eq!(returned.fine.unwrap().days_overdue, 2);
    assert_eq!(returned.available_copies, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_pg_concurrent_approvals_commit_once() {
    let (services, _) = services(pg_store().await);
    let book = title(&services, "Postgres race", 1).await;
    let a = borrower(&services, "pg-race", BorrowerRole::General).await;
    let now = Utc::now();
    let request = BorrowRequest {
        title_id: book.id,
        borrower_id: a.id,
        borrow_date: now,
        due_date: None,
    };
    let id = services.loans.request_borrow(request, now).await.unwrap().loan.id;

    let services = Arc::new(services);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = Arc::clone(&services);
            tokio::spawn(async move { services.loans.approve(id, None, now).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);
}
