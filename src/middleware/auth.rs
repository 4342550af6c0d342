// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tokens and the route guard for authenticated pages.

use crate::models::Identity;
use crate::session::SessionStore;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "base_app_session";

/// Session token lifetime.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (server-side session ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Signed-in session attached to guarded requests.
#[derive(Clone)]
pub struct CurrentSession {
    pub session_id: Uuid,
    pub store: Arc<SessionStore>,
    pub identity: Identity,
}

/// Session token from the cookie, or from an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Route guard: redirects to `/login` unless the request carries a live,
/// signed-in session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(&jar, request.headers()) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    let Ok((session_id, store)) = state.sessions.resolve(&token) else {
        tracing::debug!("Unknown or invalid session token");
        return Redirect::to(LOGIN_PATH).into_response();
    };

    // Nothing renders until the first auth-state emission is handled
    let mut rx = store.subscribe();
    let ready = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| !s.auth_loading),
    )
    .await
    .is_ok_and(|loaded| loaded.is_ok());
    if !ready {
        tracing::warn!(session_id = %session_id, "Session did not finish loading");
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let Some(identity) = store.current_identity() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    request.extensions_mut().insert(CurrentSession {
        session_id,
        store,
        identity,
    });

    next.run(request).await
}

/// Create a JWT for a session.
pub fn create_jwt(session_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: session_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL.as_secs() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Verify a session JWT and return its claims.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}
