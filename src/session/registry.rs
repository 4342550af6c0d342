// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side registry pairing session tokens with per-client stores.
//!
//! The session token is an HS256 JWT whose subject is the session id. The
//! store behind it lives in memory; sessions are lost on restart and the
//! client is sent back to `/login`.

use crate::error::AppError;
use crate::middleware::auth::{create_jwt, verify_jwt};
use crate::session::SessionStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct SessionEntry {
    store: Arc<SessionStore>,
    last_seen: Instant,
}

/// Live client sessions, keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionEntry>,
    signing_key: Vec<u8>,
}

impl SessionRegistry {
    pub fn new(signing_key: Vec<u8>) -> Self {
        Self {
            sessions: DashMap::new(),
            signing_key,
        }
    }

    /// Register a store and issue its session token.
    pub fn insert(&self, store: Arc<SessionStore>) -> Result<(Uuid, String), AppError> {
        let session_id = Uuid::new_v4();
        let token = create_jwt(&session_id.to_string(), &self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        self.sessions.insert(
            session_id,
            SessionEntry {
                store,
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(session_id = %session_id, "Session registered");
        Ok((session_id, token))
    }

    /// Look up the store behind a session token.
    pub fn resolve(&self, token: &str) -> Result<(Uuid, Arc<SessionStore>), AppError> {
        let claims = verify_jwt(token, &self.signing_key).map_err(|_| AppError::InvalidToken)?;
        let session_id: Uuid = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or(AppError::Unauthorized)?;
        entry.last_seen = Instant::now();
        Ok((session_id, entry.store.clone()))
    }

    pub fn remove(&self, session_id: &Uuid) -> Option<Arc<SessionStore>> {
        self.sessions
            .remove(session_id)
            .map(|(_, entry)| entry.store)
    }

    /// Drop sessions not seen within `max_idle`. Returns how many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() < max_idle);
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            tracing::info!(pruned, "Pruned idle sessions");
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
