// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider clients and the per-client auth handle.
//!
//! - `FirebaseAuthClient` talks to the Identity Toolkit REST API
//! - `MemoryIdentityBackend` keeps argon2-hashed accounts in memory
//! - `AuthClient` tracks the signed-in identity of one client and publishes
//!   every change on a watch channel (the auth-state change stream)

use crate::error::AppError;
use crate::models::Identity;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use dashmap::DashMap;
use rand::rngs::OsRng;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// A signed-in identity together with the provider's ID token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub id_token: String,
}

/// Credential verification and account management.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Create an account. Provider rejections are `AppError::Validation`.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    /// Verify credentials. Rejections are `AppError::Authentication`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    /// Attach a display name to the account behind `session`.
    async fn update_display_name(
        &self,
        session: &AuthSession,
        display_name: &str,
    ) -> Result<Identity, AppError>;
}

// ─── Firebase Auth (Identity Toolkit REST) ───────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AccountOp {
    SignUp,
    SignIn,
    Update,
}

/// Firebase Auth client using the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    message: String,
}

impl FirebaseAuthClient {
    /// Create a client for the given Web API key.
    ///
    /// For local development with the emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(api_key: String) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => "https://identitytoolkit.googleapis.com/v1".to_string(),
        };
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn call(
        &self,
        op: AccountOp,
        body: serde_json::Value,
    ) -> Result<AccountResponse, AppError> {
        let method = match op {
            AccountOp::SignUp => "accounts:signUp",
            AccountOp::SignIn => "accounts:signInWithPassword",
            AccountOp::Update => "accounts:update",
        };
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Identity(format!("Invalid response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<FirebaseErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        Err(classify_error(op, status.as_u16(), message))
    }
}

/// Map an Identity Toolkit failure onto the error taxonomy.
///
/// Client errors keep the provider's message untouched so callers can show it.
fn classify_error(op: AccountOp, status: u16, message: String) -> AppError {
    if status != 400 || message.starts_with("TOO_MANY_ATTEMPTS") {
        return AppError::Identity(format!("HTTP {}: {}", status, message));
    }
    match op {
        AccountOp::SignIn => AppError::Authentication(message),
        AccountOp::SignUp | AccountOp::Update => AppError::Validation(message),
    }
}

#[async_trait]
impl IdentityBackend for FirebaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account = self.call(AccountOp::SignUp, body).await?;
        tracing::info!(uid = %account.local_id, "Firebase account created");
        into_session(account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account = self.call(AccountOp::SignIn, body).await?;
        into_session(account)
    }

    async fn update_display_name(
        &self,
        session: &AuthSession,
        display_name: &str,
    ) -> Result<Identity, AppError> {
        let body = serde_json::json!({
            "idToken": session.id_token,
            "displayName": display_name,
            "returnSecureToken": false,
        });
        let account = self.call(AccountOp::Update, body).await?;
        Ok(Identity {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
        })
    }
}

fn into_session(account: AccountResponse) -> Result<AuthSession, AppError> {
    let id_token = account
        .id_token
        .ok_or_else(|| AppError::Identity("Response missing idToken".to_string()))?;
    Ok(AuthSession {
        identity: Identity {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.is_empty()),
        },
        id_token,
    })
}

// ─── In-memory backend ───────────────────────────────────────────

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
}

/// Local identity backend. Accounts live for the life of the process.
#[derive(Clone, Default)]
pub struct MemoryIdentityBackend {
    /// Keyed by lowercased email
    accounts: Arc<DashMap<String, Account>>,
    /// ID token -> email key
    tokens: Arc<DashMap<String, String>>,
}

impl MemoryIdentityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_session(&self, account: &Account) -> AuthSession {
        let id_token = uuid::Uuid::new_v4().to_string();
        self.tokens
            .insert(id_token.clone(), account.email.to_ascii_lowercase());
        AuthSession {
            identity: Identity {
                uid: account.uid.clone(),
                email: account.email.clone(),
                display_name: account.display_name.clone(),
            },
            id_token,
        }
    }
}

/// Cheaper than the argon2 defaults; this backend only serves local runs.
fn local_hasher() -> Argon2<'static> {
    let params = Params::new(8 * 1024, 1, 1, None).unwrap_or_default();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = local_hasher()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(local_hasher()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait]
impl IdentityBackend for MemoryIdentityBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = email.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::Validation("INVALID_EMAIL".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(
                "WEAK_PASSWORD : Password should be at least 6 characters".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let key = email.to_ascii_lowercase();
        let account = match self.accounts.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(AppError::Validation("EMAIL_EXISTS".to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let account = Account {
                    uid: uuid::Uuid::new_v4().simple().to_string(),
                    email: email.to_string(),
                    password_hash,
                    display_name: None,
                };
                slot.insert(account.clone());
                account
            }
        };

        tracing::debug!(uid = %account.uid, "Local account created");
        Ok(self.issue_session(&account))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let account = self
            .accounts
            .get(&email.trim().to_ascii_lowercase())
            .map(|a| a.clone())
            .ok_or_else(|| AppError::Authentication("INVALID_LOGIN_CREDENTIALS".to_string()))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::Authentication(
                "INVALID_LOGIN_CREDENTIALS".to_string(),
            ));
        }
        Ok(self.issue_session(&account))
    }

    async fn update_display_name(
        &self,
        session: &AuthSession,
        display_name: &str,
    ) -> Result<Identity, AppError> {
        let key = self
            .tokens
            .get(&session.id_token)
            .map(|k| k.clone())
            .ok_or_else(|| AppError::Validation("INVALID_ID_TOKEN".to_string()))?;
        let mut account = self
            .accounts
            .get_mut(&key)
            .ok_or_else(|| AppError::Validation("USER_NOT_FOUND".to_string()))?;

        account.display_name = Some(display_name.to_string()).filter(|n| !n.is_empty());
        Ok(Identity {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        })
    }
}

// ─── Per-client auth handle ──────────────────────────────────────

/// Signed-in state of one client, with an auth-state change stream.
///
/// Every sign-in, account creation and sign-out is published to subscribers.
/// Display-name changes update the current identity without an emission.
pub struct AuthClient {
    backend: Arc<dyn IdentityBackend>,
    current: watch::Sender<Option<Identity>>,
    session: Mutex<Option<AuthSession>>,
}

impl AuthClient {
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            backend,
            current,
            session: Mutex::new(None),
        }
    }

    /// Subscribe to auth-state changes. The current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Create an account and sign in as it.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let session = self.backend.sign_up(email, password).await?;
        Ok(self.set_session(session))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let session = self.backend.sign_in(email, password).await?;
        Ok(self.set_session(session))
    }

    /// Attach a display name to the signed-in account.
    pub async fn update_display_name(&self, display_name: &str) -> Result<Identity, AppError> {
        let session = self
            .session
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("auth session lock poisoned")))?
            .clone()
            .ok_or(AppError::Unauthorized)?;

        let identity = self
            .backend
            .update_display_name(&session, display_name)
            .await?;

        if let Ok(mut guard) = self.session.lock() {
            if let Some(current) = guard.as_mut() {
                if current.identity.uid == identity.uid {
                    current.identity = identity.clone();
                }
            }
        }
        self.current.send_if_modified(|current| {
            if let Some(current) = current.as_mut() {
                if current.uid == identity.uid {
                    *current = identity.clone();
                }
            }
            false
        });

        Ok(identity)
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = None;
        }
        self.current.send_replace(None);
    }

    fn set_session(&self, session: AuthSession) -> Identity {
        let identity = session.identity.clone();
        if let Ok(mut guard) = self.session.lock() {
            *guard = Some(session);
        }
        self.current.send_replace(Some(identity.clone()));
        identity
    }
}
