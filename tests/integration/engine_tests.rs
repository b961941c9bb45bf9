//! Loan engine scenarios on the in-memory store

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use tokio_stream::StreamExt;

use circulation_server::{
    error::AppError,
    models::{
        fine::FineQuery,
        loan::{BorrowRequest, LoanQuery},
        notification::NotificationKind,
        stats::{StatsRange, UsageBucketing},
        BorrowerRole, FineStatus, LoanStatus,
    },
};

use crate::common::{borrower, memory_store, services, t0, title};

fn borrow(title_id: i64, borrower_id: i64) -> BorrowRequest {
    BorrowRequest {
        title_id,
        borrower_id,
        borrow_date: t0(),
        due_date: None,
    }
}

#[tokio::test]
async fn single_copy_lifecycle_with_late_return() {
    let (services, emitter) = services(memory_store());
    let mut events = emitter.subscribe();
    let book = title(&services, "Piranesi", 1).await;
    let a = borrower(&services, "A", BorrowerRole::Student).await;
    let b = borrower(&services, "B", BorrowerRole::Staff).await;

    // A borrows the only copy
    let requested = services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap();
    assert_eq!(requested.loan.status, LoanStatus::Pending);
    assert_eq!(requested.available_copies, 0);
    let loan_id = requested.loan.id;

    let due = t0() + Duration::days(14);
    let approved = services.loans.approve(loan_id, Some(due), t0()).await.unwrap();
    assert_eq!(approved.loan.status, LoanStatus::Approved);
    assert_eq!(approved.loan.due_date, Some(due));

    // B finds nothing on the shelf
    let err = services
        .loans
        .request_borrow(borrow(book.id, b.id), t0() + Duration::days(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock(_)));

    // The loan is overdue two days in, returned 16 days after borrowing
    let late = t0() + Duration::days(16);
    assert_eq!(services.loans.get(loan_id, late).await.unwrap().status, LoanStatus::Overdue);
    services.loans.request_return(loan_id, Some(late), late).await.unwrap();
    let returned = services.loans.approve_return(loan_id, None, late).await.unwrap();

    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert_eq!(returned.loan.return_date, Some(late));
    assert_eq!(returned.available_copies, 1);
    let fine = returned.fine.unwrap();
    assert_eq!(fine.days_overdue, 2);
    assert_eq!(fine.amount, Decimal::new(50, 2) * Decimal::from(2));
    assert_eq!(fine.status, FineStatus::Unpaid);

    // B can now borrow
    let b_loan = services.loans.request_borrow(borrow(book.id, b.id), late).await.unwrap();
    assert_eq!(b_loan.available_copies, 0);

    let kinds: Vec<NotificationKind> = {
        let mut kinds = Vec::new();
        for _ in 0..6 {
            kinds.push(events.next().await.unwrap().unwrap().kind);
        }
        kinds
    };
    assert_eq!(
        kinds,
        vec![
            NotificationKind::LoanRequested,
            NotificationKind::LoanApproved,
            NotificationKind::ReturnRequested,
            NotificationKind::LoanReturned,
            NotificationKind::FineIssued,
            NotificationKind::LoanRequested,
        ]
    );
}

#[tokio::test]
async fn terminal_loans_accept_no_transition() {
    let (services, _) = services(memory_store());
    let book = title(&services, "Beloved", 1).await;
    let a = borrower(&services, "A", BorrowerRole::General).await;

    let id = services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap().loan.id;
    services.loans.reject(id, t0()).await.unwrap();

    let results = [
        services.loans.approve(id, None, t0()).await,
        services.loans.reject(id, t0()).await,
        services.loans.request_return(id, None, t0()).await,
        services.loans.approve_return(id, None, t0()).await,
        services.loans.reject_return(id, t0()).await,
    ];
    for result in results {
        match result {
            Err(AppError::InvalidTransition(msg)) => assert!(msg.ends_with("Current status: REJECTED"), "{}", msg),
            other => panic!("unexpected {:?}", other.map(|o| o.loan.status)),
        }
    }
    assert_eq!(services.catalog.get_title(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn rejected_return_keeps_the_copy_out() {
    let (services, _) = services(memory_store());
    let book = title(&services, "Middlemarch", 2).await;
    let a = borrower(&services, "A", BorrowerRole::General).await;

    let id = services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap().loan.id;
    services.loans.approve(id, None, t0()).await.unwrap();
    services.loans.request_return(id, None, t0() + Duration::days(2)).await.unwrap();
    let back = services.loans.reject_return(id, t0() + Duration::days(2)).await.unwrap();

    assert_eq!(back.previous_status, Some(LoanStatus::ReturnRequested));
    assert_eq!(back.loan.status, LoanStatus::Approved);
    assert_eq!(back.available_copies, 1);
    assert!(services.loans.request_return(id, None, t0() + Duration::days(3)).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_commit_once() {
    let (services, _) = services(memory_store());
    let book = title(&services, "Dhalgren", 1).await;
    let a = borrower(&services, "A", BorrowerRole::General).await;
    let id = services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap().loan.id;

    let services = Arc::new(services);
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let services = Arc::clone(&services);
            tokio::spawn(async move { services.loans.approve(id, None, t0()).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(AppError::InvalidTransition(_)) => {}
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert_eq!(committed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_never_oversell() {
    let (services, _) = services(memory_store());
    let book = title(&services, "Gideon the Ninth", 3).await;
    let mut borrowers = Vec::new();
    for i in 0..12 {
        borrowers.push(borrower(&services, &format!("reader-{}", i), BorrowerRole::Student).await);
    }

    let services = Arc::new(services);
    let handles: Vec<_> = borrowers
        .iter()
        .map(|b| {
            let services = Arc::clone(&services);
            let request = borrow(book.id, b.id);
            tokio::spawn(async move { services.loans.request_borrow(request, t0()).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::OutOfStock(_)) => {}
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert_eq!(granted, 3);
    assert_eq!(services.catalog.get_title(book.id).await.unwrap().available_copies, 0);
}

#[tokio::test]
async fn copies_are_conserved_across_mixed_operations() {
    let (services, _) = services(memory_store());
    let book = title(&services, "The Dispossessed", 4).await;
    let mut ids = Vec::new();
    for i in 0..4 {
        let b = borrower(&services, &format!("r{}", i), BorrowerRole::General).await;
        ids.push(services.loans.request_borrow(borrow(book.id, b.id), t0()).await.unwrap().loan.id);
    }

    services.loans.reject(ids[0], t0()).await.unwrap();
    services.loans.approve(ids[1], None, t0()).await.unwrap();
    services.loans.approve(ids[2], None, t0()).await.unwrap();
    services.loans.request_return(ids[2], None, t0() + Duration::days(1)).await.unwrap();
    services.loans.approve_return(ids[2], None, t0() + Duration::days(1)).await.unwrap();

    let title = services.catalog.get_title(book.id).await.unwrap();
    let active = services
        .loans
        .list(&LoanQuery::default(), t0())
        .await
        .unwrap()
        .into_iter()
        .filter(|l| !l.status.is_terminal())
        .count() as i32;
    assert_eq!(title.available_copies + active, title.total_copies);
    assert_eq!(active, 2);

    // Shrinking below the copies on loan is refused
    let err = services
        .catalog
        .update_copies(
            book.id,
            circulation_server::models::title::UpdateCopies { total_copies: 1 },
            t0(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn duplicate_active_loans_are_refused() {
    let (services, _) = services(memory_store());
    let book = title(&services, "Frankenstein", 3).await;
    let a = borrower(&services, "A", BorrowerRole::General).await;

    services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap();
    let err = services.loans.request_borrow(borrow(book.id, a.id), t0()).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateActiveLoan(_)));
    assert_eq!(services.catalog.get_title(book.id).await.unwrap().available_copies, 2);
}

#[tokio::test]
async fn dashboard_reflects_history() {
    let (services, _) = services(memory_store());
    let popular = title(&services, "Popular", 3).await;
    let quiet = title(&services, "Quiet", 1).await;
    let a = borrower(&services, "A", BorrowerRole::Student).await;
    let b = borrower(&services, "B", BorrowerRole::Staff).await;

    let first = services.loans.request_borrow(borrow(popular.id, a.id), t0()).await.unwrap().loan.id;
    services.loans.request_borrow(borrow(popular.id, b.id), t0()).await.unwrap();
    let rejected = services.loans.request_borrow(borrow(quiet.id, a.id), t0()).await.unwrap().loan.id;
    services.loans.reject(rejected, t0()).await.unwrap();
    services.loans.approve(first, Some(t0() + Duration::days(1)), t0()).await.unwrap();

    let now = t0() + Duration::days(3);
    let stats = services.stats.dashboard(StatsRange::Week, now).await.unwrap();

    assert_eq!(stats.activity.len(), 7);
    assert_eq!(stats.total_borrowed, 3);
    assert_eq!(stats.total_returned, 0);
    assert_eq!(stats.popular.len(), 1);
    assert_eq!(stats.popular[0].title_id, popular.id);
    assert_eq!(stats.popular[0].borrow_count, 2);
    assert_eq!(stats.status_distribution.total_titles, 2);
    assert_eq!(stats.status_distribution.overdue.count, 1);
    assert_eq!(stats.status_distribution.available.count, 1);
    assert_eq!(stats.totals.overdue_loans, 1);
    assert_eq!(stats.totals.pending_requests, 1);

    let usage = services.stats.usage(UsageBucketing::Month, Some(2024)).await.unwrap();
    assert_eq!(usage.buckets.len(), 12);
    assert_eq!(usage.series[&BorrowerRole::Student][1], 2);
    assert_eq!(usage.series[&BorrowerRole::Staff][1], 1);
    assert_eq!(usage.series[&BorrowerRole::General].iter().sum::<i64>(), 0);

    let fines = services.fines.list(&FineQuery::default()).await.unwrap();
    assert!(fines.is_empty());
}
