//! HTTP tests through the router

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use circulation_server::api::create_router;

use crate::common::app_state;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|body| body.to_string())).await
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Router with one title of `copies` copies and two borrowers
async fn seeded_app(copies: i32) -> Router {
    let app = create_router(app_state());
    let (status, _) = send(
        &app,
        Method::POST,
        "/titles",
        Some(json!({ "name": "Station Eleven", "author": "Emily St. John Mandel", "totalCopies": copies })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    for (name, role) in [("Ada", "student"), ("Brook", "staff")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/borrowers",
            Some(json!({ "displayName": name, "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app
}

fn borrow_body(borrower_id: i64) -> Value {
    json!({
        "titleId": 1,
        "borrowerId": borrower_id,
        "borrowDate": Utc::now() - Duration::minutes(1),
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(app_state());
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_borrow_and_out_of_stock() {
    let app = seeded_app(1).await;

    let (status, body) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["loan"]["status"], "PENDING");
    assert_eq!(body["availableCopies"], 0);

    let (status, body) = send(&app, Method::POST, "/borrow", Some(borrow_body(2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "OutOfStock");

    let (status, body) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DuplicateActiveLoan");
}

#[tokio::test]
async fn test_approve_twice_reports_current_status() {
    let app = seeded_app(1).await;
    let (_, created) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    let id = created["loan"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::PATCH, &format!("/loan/{}/approve", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "APPROVED");
    assert_eq!(body["previousStatus"], "PENDING");
    assert!(body["loan"]["dueDate"].is_string());

    let (status, body) = send(&app, Method::PATCH, &format!("/loan/{}/approve", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");
    assert_eq!(
        body["message"],
        "Only PENDING requests can be approved. Current status: APPROVED"
    );
}

#[tokio::test]
async fn test_full_return_cycle_and_listing() {
    let app = seeded_app(2).await;
    let (_, created) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    let id = created["loan"]["id"].as_i64().unwrap();

    send(&app, Method::PATCH, &format!("/loan/{}/approve", id), None).await;
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/loan/{}/request-return", id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PATCH, &format!("/loan/{}/return", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "RETURNED");
    assert_eq!(body["availableCopies"], 2);
    assert!(body["fine"].is_null());

    let (status, body) = send(&app, Method::GET, "/loans?status=RETURNED", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/loans?status=PENDING", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_releases_copy() {
    let app = seeded_app(1).await;
    let (_, created) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    let id = created["loan"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::PATCH, &format!("/loan/{}/reject", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "REJECTED");

    let (_, title) = send(&app, Method::GET, "/titles/1", None).await;
    assert_eq!(title["availableCopies"], 1);

    let (status, _) = send(&app, Method::POST, "/borrow", Some(borrow_body(2))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_fine_endpoints() {
    let app = seeded_app(1).await;
    let borrowed = Utc::now() - Duration::days(20);
    let (_, created) = send(
        &app,
        Method::POST,
        "/borrow",
        Some(json!({ "titleId": 1, "borrowerId": 1, "borrowDate": borrowed })),
    )
    .await;
    let id = created["loan"]["id"].as_i64().unwrap();
    send(&app, Method::PATCH, &format!("/loan/{}/approve", id), None).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/fine",
        Some(json!({ "loanId": id, "amount": "3.00", "reason": "Late", "daysOverdue": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "UNPAID");
    let fine_id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/fine",
        Some(json!({ "loanId": id, "amount": "1.00", "reason": "Again", "daysOverdue": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, body) = send(&app, Method::PATCH, &format!("/fine/{}/pay", fine_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PAID");

    let (status, body) = send(&app, Method::PATCH, &format!("/fine/{}/pay", fine_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidTransition");

    let (_, body) = send(&app, Method::GET, "/fines?status=PAID", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_loan_is_not_found() {
    let app = seeded_app(1).await;
    let (status, body) = send(&app, Method::GET, "/loan/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (status, _) = send(&app, Method::PATCH, "/loan/999/approve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = seeded_app(2).await;
    send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;

    let (status, body) = send(&app, Method::GET, "/dashboard/stats?range=week", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "week");
    assert_eq!(body["activity"].as_array().unwrap().len(), 7);
    assert_eq!(body["totalBorrowed"], 1);
    assert_eq!(body["popular"][0]["borrowCount"], 1);

    let (status, body) = send(&app, Method::GET, "/stats/usage?by=weekday", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buckets"].as_array().unwrap().len(), 7);
    assert!(body["series"]["student"].is_array());
}

#[tokio::test]
async fn test_malformed_optional_body_is_rejected() {
    let app = seeded_app(1).await;
    let (_, created) = send(&app, Method::POST, "/borrow", Some(borrow_body(1))).await;
    let id = created["loan"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/loan/{}/approve", id),
        Some(json!({ "dueDate": "not-a-date" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (_, loan) = send(&app, Method::GET, &format!("/loan/{}", id), None).await;
    assert_eq!(loan["status"], "PENDING");
    assert!(loan["dueDate"].is_null());

    send(&app, Method::PATCH, &format!("/loan/{}/approve", id), Some(json!({}))).await;
    send(&app, Method::PATCH, &format!("/loan/{}/request-return", id), None).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/loan/{}/return", id),
        Some(json!({ "returnDate": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (_, loan) = send(&app, Method::GET, &format!("/loan/{}", id), None).await;
    assert_eq!(loan["status"], "RETURN_REQUESTED");
    let (_, title) = send(&app, Method::GET, "/titles/1", None).await;
    assert_eq!(title["availableCopies"], 0);
}

#[tokio::test]
async fn test_malformed_payment_date_leaves_fine_unpaid() {
    let app = seeded_app(1).await;
    let borrowed = Utc::now() - Duration::days(20);
    let (_, created) = send(
        &app,
        Method::POST,
        "/borrow",
        Some(json!({ "titleId": 1, "borrowerId": 1, "borrowDate": borrowed })),
    )
    .await;
    let id = created["loan"]["id"].as_i64().unwrap();
    send(&app, Method::PATCH, &format!("/loan/{}/approve", id), None).await;
    let (_, fine) = send(
        &app,
        Method::POST,
        "/fine",
        Some(json!({ "loanId": id, "amount": "2.00", "reason": "Late", "daysOverdue": 2 })),
    )
    .await;
    let fine_id = fine["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/fine/{}/pay", fine_id),
        Some(json!({ "paidAt": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (_, fine) = send(&app, Method::GET, &format!("/fine/{}", fine_id), None).await;
    assert_eq!(fine["status"], "UNPAID");
    assert!(fine["paidAt"].is_null());
}

#[tokio::test]
async fn test_rejected_input_carries_error_body() {
    let app = seeded_app(1).await;

    let (status, body) = send(&app, Method::GET, "/dashboard/stats?range=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
    assert_eq!(body["code"], 18);

    let (status, body) = send_raw(&app, Method::POST, "/borrow", Some("{oops".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (status, body) = send(&app, Method::POST, "/borrow", Some(json!({ "titleId": 1 }))).await;
    assert!(status.is_client_error());
    assert_eq!(body["error"], "BadRequest");

    let (status, body) = send(&app, Method::GET, "/loan/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (_, title) = send(&app, Method::GET, "/titles/1", None).await;
    assert_eq!(title["availableCopies"], 1);
}
