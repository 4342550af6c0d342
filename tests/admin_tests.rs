// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role testing controls and the admin promotion utility.

use axum::http::StatusCode;
use base_app::config::Config;
use base_app::db::{MemoryDb, UserRecordStore};
use base_app::models::{Role, UserRecord};
use base_app::routes::create_router;
use base_app::services::promote_to_admin;
use std::sync::Arc;

mod common;
use common::{create_test_app, json_body, send, signup, test_state_with};

#[tokio::test]
async fn test_promote_to_admin_writes_role() {
    let db = MemoryDb::new();
    let record = UserRecord::new_default("a@b.com", "A", "2026-01-01T00:00:00.000Z".to_string());
    db.set_user("uid-1", &record).await.unwrap();

    promote_to_admin(&db, "uid-1").await.unwrap();

    let record = db.get_user("uid-1").await.unwrap().unwrap();
    assert_eq!(record.role, Role::Admin);
    assert!(record.updated_at.is_some());
}

#[tokio::test]
async fn test_promote_to_admin_errors() {
    let db = MemoryDb::new();

    let err = promote_to_admin(&db, "").await.unwrap_err();
    assert!(err.is_validation_error());

    // Missing record: the update has nothing to write to
    assert!(promote_to_admin(&db, "missing").await.is_err());
    assert!(db.is_empty());
}

#[tokio::test]
async fn test_role_controls_cycle_roles() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(
        body["role_controls"]["available"],
        serde_json::json!(["subscriber", "admin"])
    );

    let response = send(
        &app,
        "POST",
        "/admin/role",
        &cookie,
        Some(serde_json::json!({"role": "admin"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "admin");
    assert_eq!(body["message"], "Role successfully changed to ADMIN");

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["badge"], "Admin");
    assert_eq!(body["sections"].as_array().unwrap().len(), 3);
    assert!(body["subscription_action"].is_null());

    let response = send(
        &app,
        "POST",
        "/admin/role",
        &cookie,
        Some(serde_json::json!({"role": "free"})),
    )
    .await;
    assert_eq!(json_body(response).await["role"], "free");
}

#[tokio::test]
async fn test_role_controls_reject_unknown_role() {
    let (app, _) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let response = send(
        &app,
        "POST",
        "/admin/role",
        &cookie,
        Some(serde_json::json!({"role": "superuser"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_argument");

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert_eq!(body["role"], "free");
}

#[tokio::test]
async fn test_role_controls_disabled() {
    let config = Config {
        enable_role_controls: false,
        ..Config::test_default()
    };
    let state = test_state_with(config, Arc::new(MemoryDb::new()));
    let app = create_router(state);
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let response = send(
        &app,
        "POST",
        "/admin/role",
        &cookie,
        Some(serde_json::json!({"role": "admin"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(send(&app, "GET", "/dashboard", &cookie, None).await).await;
    assert!(body["role_controls"].is_null());
    assert_eq!(body["role"], "free");
}
