// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard, session cookie and CORS tests.
//!
//! These tests verify that:
//! 1. Guarded routes redirect to /login without a live session
//! 2. Signup and login issue a session cookie that opens guarded routes
//! 3. Logout drops the session
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base_app::middleware::auth::create_jwt;
use tower::ServiceExt;

mod common;
use common::{create_test_app, json_body, send, session_cookie, signup};

#[tokio::test]
async fn test_guarded_routes_redirect_without_session() {
    let (app, _) = create_test_app();

    for uri in ["/dashboard", "/profile", "/payment"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }
}

#[tokio::test]
async fn test_unknown_session_redirects() {
    let (app, state) = create_test_app();

    // Well-signed token for a session the server never issued
    let token = create_jwt(
        &uuid::Uuid::new_v4().to_string(),
        &state.config.jwt_signing_key,
    )
    .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, "GET", "/dashboard", "base_app_session=garbage", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_signup_opens_dashboard() {
    let (app, state) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;
    assert_eq!(state.sessions.len(), 1);

    let response = send(&app, "GET", "/dashboard", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["role"], "free");
    assert_eq!(body["badge"], "Free User");
    assert_eq!(body["summary"]["name"], "Ada");
    assert_eq!(body["summary"]["email"], "ada@example.com");
    assert_eq!(body["subscription_action"]["label"], "Upgrade to Premium");
    assert_eq!(body["sections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let (app, _) = create_test_app();
    let body = serde_json::json!({
        "email": "ada@example.com",
        "password": "secret123",
        "name": "Ada",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("base_app_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=2592000"));

    let body = json_body(response).await;
    assert_eq!(body["role"], "free");
    assert_eq!(body["user"]["display_name"], "Ada");
}

#[tokio::test]
async fn test_signup_validation_error() {
    let (app, state) = create_test_app();
    let body = serde_json::json!({
        "email": "not-an-email",
        "password": "123",
        "name": "",
    });
    let response = send(&app, "POST", "/signup", "", Some(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(session_cookie(&response).is_none());
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let (app, _) = create_test_app();
    signup(&app, "ada@example.com", "Ada").await;

    let body = serde_json::json!({
        "email": "ada@example.com",
        "password": "secret123",
        "name": "Other",
    });
    let response = send(&app, "POST", "/signup", "", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"], "EMAIL_EXISTS");
}

#[tokio::test]
async fn test_login_and_bad_credentials() {
    let (app, state) = create_test_app();
    let first = signup(&app, "ada@example.com", "Ada").await;
    send(&app, "POST", "/logout", &first, None).await;
    assert!(state.sessions.is_empty());

    let wrong = serde_json::json!({"email": "ada@example.com", "password": "nope123"});
    let response = send(&app, "POST", "/login", "", Some(wrong)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());

    let right = serde_json::json!({"email": "ada@example.com", "password": "secret123"});
    let response = send(&app, "POST", "/login", "", Some(right)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let body = json_body(response).await;
    assert_eq!(body["role"], "free");

    let response = send(&app, "GET", "/dashboard", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (app, state) = create_test_app();
    let cookie = signup(&app, "ada@example.com", "Ada").await;

    let response = send(&app, "POST", "/logout", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let removal = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(removal.starts_with("base_app_session="));
    assert!(removal.contains("Max-Age=0"));
    assert!(state.sessions.is_empty());

    let response = send(&app, "GET", "/dashboard", &cookie, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_home_reflects_session() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/", "", None).await;
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["navigation"][0]["href"], "/login");

    let cookie = signup(&app, "ada@example.com", "Ada").await;
    let response = send(&app, "GET", "/", &cookie, None).await;
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["actions"][0]["href"], "/dashboard");
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/profile")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}
