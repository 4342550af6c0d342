// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password signup, login and logout.
//!
//! A successful signup or login starts a fresh `SessionStore`, registers it
//! and hands the client a session cookie. The response is sent only once the
//! store has resolved the new identity's role and profile.

use crate::error::{AppError, Result};
use crate::middleware::auth::{session_token, SESSION_COOKIE, SESSION_TTL};
use crate::models::{Identity, ProfileState, Role};
use crate::session::SessionStore;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signed-in user as returned after signup and login.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: Identity,
    pub role: Role,
    pub profile: Option<ProfileState>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Collapse validator output into one readable message.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("Invalid {}", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

fn validate<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| AppError::Validation(validation_message(&e)))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL.as_secs() as i64))
        .build()
}

/// Sign out and forget whatever session the request carried.
fn end_existing_session(state: &AppState, jar: &CookieJar, headers: &HeaderMap) {
    let Some(token) = session_token(jar, headers) else {
        return;
    };
    if let Ok((session_id, store)) = state.sessions.resolve(&token) {
        store.logout();
        state.sessions.remove(&session_id);
        tracing::debug!(session_id = %session_id, "Replaced existing session");
    }
}

/// Register the store, wait for its identity to resolve and set the cookie.
async fn establish_session(
    state: &AppState,
    jar: CookieJar,
    store: Arc<SessionStore>,
    identity: &Identity,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let resolved = store.wait_until_resolved(&identity.uid).await?;
    let (session_id, token) = state.sessions.insert(store)?;
    tracing::info!(uid = %identity.uid, session_id = %session_id, "Session established");

    let secure = state.config.public_url.starts_with("https://");
    let jar = jar.add(session_cookie(token, secure));

    Ok((
        jar,
        Json(SessionResponse {
            user: resolved.identity.unwrap_or_else(|| identity.clone()),
            role: resolved.role.unwrap_or_default(),
            profile: resolved.profile,
        }),
    ))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    validate(&request)?;

    let store = state.new_session_store();
    let identity = store
        .signup(request.email.trim(), &request.password, &request.name)
        .await?;

    end_existing_session(&state, &jar, &headers);
    establish_session(&state, jar, store, &identity).await
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    validate(&request)?;

    let store = state.new_session_store();
    let identity = store
        .login(request.email.trim(), &request.password)
        .await?;

    end_existing_session(&state, &jar, &headers);
    establish_session(&state, jar, store, &identity).await
}

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<LogoutResponse>) {
    end_existing_session(&state, &jar, &headers);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(LogoutResponse { success: true }))
}
