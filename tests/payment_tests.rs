// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription flow tests (simulated gateway).

use axum::http::StatusCode;
use base_app::db::{MemoryDb, UserRecordStore};
use base_app::error::AppError;
use base_app::models::Role;
use base_app::services::payment::{PaymentService, PlanId};
use std::sync::atomic::Ordering;
use std::sync::Arc;

mod common;
use common::{create_test_app, json_body, send, signup, test_store, FailingStore};

#[tokio::test]
async fn test_payment_page_lists_plans_for_free_users() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let response = send(&app, "GET", "/payment", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["subscribed"], false);
    assert_eq!(body["default_plan"], "monthly");
    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["id"], "monthly");
    assert_eq!(plans[0]["price_cents"], 999);
    assert_eq!(plans[1]["id"], "annual");
}

#[tokio::test]
async fn test_subscribe_then_cancel() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let payment = serde_json::json!({"plan": "annual", "payment_method_id": "pm_card_visa"});
    let response = send(&app, "POST", "/payment", &cookie, Some(payment)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["plan"], "annual");
    assert_eq!(body["amount"], "$99.99");
    assert_eq!(body["role_updated"], true);
    assert_eq!(body["role"], "subscriber");

    // Subscribers manage their plan instead of choosing one
    let body = json_body(send(&app, "GET", "/payment", &cookie, None).await).await;
    assert_eq!(body["subscribed"], true);
    assert!(body["plans"].as_array().unwrap().is_empty());

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["badge"], "Subscriber");
    assert_eq!(body["subscription_action"]["label"], "Manage Subscription");
    assert_eq!(body["sections"].as_array().unwrap().len(), 2);

    let response = send(&app, "POST", "/payment/cancel", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "free");

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["role"], "free");
}

#[tokio::test]
async fn test_rejected_payment_method() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let payment = serde_json::json!({"plan": "monthly", "payment_method_id": "tok_bogus"});
    let response = send(&app, "POST", "/payment", &cookie, Some(payment)).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let payment = serde_json::json!({"payment_method_id": "  "});
    let response = send(&app, "POST", "/payment", &cookie, Some(payment)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["role"], "free");
}

#[tokio::test]
async fn test_unknown_plan_is_rejected() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let payment = serde_json::json!({"plan": "weekly", "payment_method_id": "pm_card_visa"});
    let response = send(&app, "POST", "/payment", &cookie, Some(payment)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["role"], "free");
}

#[tokio::test]
async fn test_role_write_failure_does_not_fail_payment() {
    let db = Arc::new(FailingStore::default());
    let store = test_store(db.clone());
    let user = store.signup("a@b.com", "secret123", "A").await.unwrap();
    store.wait_until_resolved(&user.uid).await.unwrap();
    db.fail_writes.store(true, Ordering::SeqCst);

    let outcome = PaymentService::simulated()
        .subscribe(&store, PlanId::Monthly, "pm_card_visa")
        .await
        .unwrap();
    assert!(!outcome.role_updated);
    assert_eq!(outcome.role, Role::Free);
    assert_eq!(outcome.amount, "$9.99");

    // Cancellation failures do propagate
    let err = PaymentService::simulated().cancel(&store).await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
async fn test_subscribe_requires_signed_in_user() {
    let store = test_store(Arc::new(MemoryDb::new()));
    let err = PaymentService::simulated()
        .subscribe(&store, PlanId::Monthly, "pm_card_visa")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn test_subscription_persists_role() {
    let db = Arc::new(MemoryDb::new());
    let store = test_store(db.clone());
    let user = store.signup("a@b.com", "secret123", "A").await.unwrap();
    store.wait_until_resolved(&user.uid).await.unwrap();

    PaymentService::simulated()
        .subscribe(&store, PlanId::Annual, "pm_123")
        .await
        .unwrap();

    let record = db.get_user(&user.uid).await.unwrap().unwrap();
    assert_eq!(record.role, Role::Subscriber);
    assert!(store.is_subscriber());
}
