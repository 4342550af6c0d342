// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use base_app::config::Config;
use base_app::db::{AvatarUpdate, FirestoreDb, MemoryDb, UserRecordStore};
use base_app::error::AppError;
use base_app::models::{ProfilePatch, Role, UserRecord};
use base_app::routes::create_router;
use base_app::services::{
    AuthClient, FileUploader, IdentityBackend, MemoryIdentityBackend, PaymentService,
};
use base_app::session::{SessionRegistry, SessionStore};
use base_app::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Build app state over in-memory backends.
#[allow(dead_code)]
pub fn test_state_with(config: Config, db: Arc<dyn UserRecordStore>) -> Arc<AppState> {
    let uploader = FileUploader::simulated(&config.public_url);
    Arc::new(AppState {
        sessions: SessionRegistry::new(config.jwt_signing_key.clone()),
        config,
        db,
        identity: Arc::new(MemoryIdentityBackend::new()),
        uploader: Arc::new(uploader),
        payments: PaymentService::simulated(),
    })
}

/// Create a test app with in-memory dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state_with(Config::test_default(), Arc::new(MemoryDb::new()));
    (create_router(state.clone()), state)
}

/// A session store over fresh in-memory backends, signed out.
#[allow(dead_code)]
pub fn test_store(db: Arc<dyn UserRecordStore>) -> Arc<SessionStore> {
    test_store_with_identity(db, Arc::new(MemoryIdentityBackend::new()))
}

#[allow(dead_code)]
pub fn test_store_with_identity(
    db: Arc<dyn UserRecordStore>,
    identity: Arc<dyn IdentityBackend>,
) -> Arc<SessionStore> {
    SessionStore::start(
        AuthClient::new(identity),
        db,
        Arc::new(FileUploader::simulated("http://localhost:8080")),
    )
}

/// Sign up through the HTTP API and return the session cookie.
#[allow(dead_code)]
pub async fn signup(app: &axum::Router, email: &str, name: &str) -> String {
    let body = serde_json::json!({
        "email": email,
        "password": "secret123",
        "name": name,
    });
    let response = app
        .clone()
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
    assert_eq!(response.status(), StatusCode::OK, "signup failed");
    session_cookie(&response).expect("signup did not set a session cookie")
}

/// `name=value` of the session cookie set by `response`, if any.
#[allow(dead_code)]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("base_app_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Send a request carrying `cookie`.
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    cookie: &str,
    json: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    let body = match json {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Record store whose reads (and optionally writes) fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryDb,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), AppError> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Database("unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRecordStore for FailingStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        self.check(&self.fail_reads)?;
        self.inner.get_user(uid).await
    }

    async fn set_user(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        self.check(&self.fail_writes)?;
        self.inner.set_user(uid, record).await
    }

    async fn create_user_if_absent(
        &self,
        uid: &str,
        record: &UserRecord,
    ) -> Result<bool, AppError> {
        self.check(&self.fail_writes)?;
        self.inner.create_user_if_absent(uid, record).await
    }

    async fn update_role(&self, uid: &str, role: Role, updated_at: &str) -> Result<(), AppError> {
        self.check(&self.fail_writes)?;
        self.inner.update_role(uid, role, updated_at).await
    }

    async fn update_avatar(&self, uid: &str, avatar: &AvatarUpdate) -> Result<(), AppError> {
        self.check(&self.fail_writes)?;
        self.inner.update_avatar(uid, avatar).await
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        self.check(&self.fail_writes)?;
        self.inner.merge_profile(uid, patch).await
    }
}

/// Record store that holds the next armed read until released.
#[allow(dead_code)]
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryDb,
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

#[allow(dead_code)]
impl GatedStore {
    /// Hold the next `get_user` until `release` is notified.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRecordStore for GatedStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        // Snapshot before waiting so the held read returns older data
        let snapshot = self.inner.get_user(uid).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        snapshot
    }

    async fn set_user(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        self.inner.set_user(uid, record).await
    }

    async fn create_user_if_absent(
        &self,
        uid: &str,
        record: &UserRecord,
    ) -> Result<bool, AppError> {
        self.inner.create_user_if_absent(uid, record).await
    }

    async fn update_role(&self, uid: &str, role: Role, updated_at: &str) -> Result<(), AppError> {
        self.inner.update_role(uid, role, updated_at).await
    }

    async fn update_avatar(&self, uid: &str, avatar: &AvatarUpdate) -> Result<(), AppError> {
        self.inner.update_avatar(uid, avatar).await
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        self.inner.merge_profile(uid, patch).await
    }
}
