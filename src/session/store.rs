// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session/role/profile store for one client.
//!
//! `SessionStore` is the only writer of `SessionState`. Observers get
//! snapshots through `subscribe()` / `snapshot()`.
//!
//! On start the store follows the client's auth-state stream. For every
//! emitted identity it publishes the identity, then resolves role and
//! profile from the user record:
//! - record found: publish it
//! - record missing: create the default record, publish defaults
//! - read failed: publish `free` and the default profile, write nothing
//!
//! A null identity clears role and profile. `auth_loading` drops to false
//! once the first emission has been handled.
//!
//! Overlapping profile fetches are not serialized; whichever completes last
//! wins.

use crate::db::{AvatarUpdate, UserRecordStore};
use crate::error::AppError;
use crate::models::{Identity, Profile, ProfilePatch, ProfileState, Role, UserRecord};
use crate::services::identity::AuthClient;
use crate::services::storage::{FileUpload, FileUploader};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// How long handlers wait for a freshly signed-in identity to resolve.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Path prefix for avatar uploads.
const AVATAR_PREFIX: &str = "avatars";

/// `avatars/<uid>` for stored uploads, `avatars/<uid>-<millis>` for
/// simulated ones.
fn owns_avatar_path(uid: &str, path: &str) -> bool {
    let Some(name) = path
        .strip_prefix(AVATAR_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return false;
    };
    match name.strip_prefix(uid) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|millis| !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Snapshot of one client's session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub profile: Option<ProfileState>,
    /// True until the first auth-state emission has been handled
    pub auth_loading: bool,
    /// True while a profile or avatar operation is in flight
    pub profile_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            role: None,
            profile: None,
            auth_loading: true,
            profile_loading: false,
        }
    }
}

impl SessionState {
    fn is_current(&self, uid: &str) -> bool {
        self.identity.as_ref().is_some_and(|i| i.uid == uid)
    }
}

pub struct SessionStore {
    auth: AuthClient,
    db: Arc<dyn UserRecordStore>,
    uploader: Arc<FileUploader>,
    state: watch::Sender<SessionState>,
    profile_ops: AtomicUsize,
}

/// Marks a profile operation in flight for as long as it is alive.
struct ProfileOp<'a> {
    store: &'a SessionStore,
}

impl Drop for ProfileOp<'_> {
    fn drop(&mut self) {
        self.store.profile_ops.fetch_sub(1, Ordering::SeqCst);
        self.store.publish_profile_loading();
    }
}

impl SessionStore {
    /// Create the store and start following `auth`'s state changes.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(
        auth: AuthClient,
        db: Arc<dyn UserRecordStore>,
        uploader: Arc<FileUploader>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let store = Arc::new(Self {
            auth,
            db,
            uploader,
            state,
            profile_ops: AtomicUsize::new(0),
        });

        let changes = store.auth.subscribe();
        tokio::spawn(follow_auth_changes(Arc::downgrade(&store), changes));
        store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().role.is_some_and(|r| r.is_admin())
    }

    /// Subscribers and admins.
    pub fn is_subscriber(&self) -> bool {
        self.state.borrow().role.is_some_and(|r| r.is_subscriber())
    }

    // ─── Authentication ──────────────────────────────────────────

    /// Create an account, attach the display name and write the default record.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Identity, AppError> {
        let mut identity = self.auth.create_user(email, password).await?;

        let display_name = display_name.trim();
        if !display_name.is_empty() {
            identity = self.auth.update_display_name(display_name).await?;
            // Same user, new name: not an auth-state change
            self.state.send_if_modified(|s| {
                if let Some(current) = s.identity.as_mut().filter(|i| i.uid == identity.uid) {
                    *current = identity.clone();
                }
                false
            });
        }

        let record_email = if identity.email.is_empty() {
            email
        } else {
            identity.email.as_str()
        };
        let record = UserRecord::new_default(record_email, display_name, now_rfc3339());
        self.db.set_user(&identity.uid, &record).await?;

        tracing::info!(uid = %identity.uid, "User signed up");
        Ok(identity)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let identity = self.auth.sign_in(email, password).await?;
        tracing::info!(uid = %identity.uid, "User logged in");
        Ok(identity)
    }

    /// Sign out. Identity, role and profile are cleared before this returns.
    pub fn logout(&self) {
        self.auth.sign_out();
        self.state.send_modify(|s| {
            s.identity = None;
            s.role = None;
            s.profile = None;
        });
        tracing::debug!("Session signed out");
    }

    /// Wait until the session reflects `uid` with a resolved role.
    pub async fn wait_until_resolved(&self, uid: &str) -> Result<SessionState, AppError> {
        let mut rx = self.state.subscribe();
        let resolved = rx.wait_for(|s| !s.auth_loading && s.role.is_some() && s.is_current(uid));

        let result = match tokio::time::timeout(RESOLVE_TIMEOUT, resolved).await {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(AppError::Internal(anyhow::anyhow!("Session closed"))),
            Err(_) => Err(AppError::Identity(format!(
                "Timed out resolving session for {}",
                uid
            ))),
        };
        result
    }

    /// Re-resolve role and profile for the current identity.
    pub async fn refresh(&self) {
        let identity = self.auth.current_user();
        self.resolve_identity(identity).await;
    }

    // ─── Role ────────────────────────────────────────────────────

    /// Validate and persist a role given as a string.
    pub async fn update_user_role(&self, uid: &str, new_role: &str) -> Result<Role, AppError> {
        let role: Role = new_role.parse()?;
        self.set_user_role(uid, role).await?;
        Ok(role)
    }

    /// Persist `role` for `uid`; in-memory role follows once the write succeeds.
    pub async fn set_user_role(&self, uid: &str, role: Role) -> Result<(), AppError> {
        if uid.trim().is_empty() {
            return Err(AppError::InvalidArgument("User ID is required".to_string()));
        }

        self.db
            .update_role(uid, role, &now_rfc3339())
            .await
            .map_err(|e| {
                tracing::error!(uid, error = %e, "Error updating user role");
                e
            })?;

        self.state.send_if_modified(|s| {
            if s.is_current(uid) {
                s.role = Some(role);
                true
            } else {
                false
            }
        });

        tracing::info!(uid, role = %role, "User role updated");
        Ok(())
    }

    // ─── Profile ─────────────────────────────────────────────────

    /// Upload a new avatar and record it on the user. Returns its URL.
    pub async fn upload_avatar(&self, file: &FileUpload, uid: &str) -> Result<String, AppError> {
        if uid.trim().is_empty() {
            return Err(AppError::InvalidArgument("User ID is required".to_string()));
        }
        let _op = self.begin_profile_op();

        let upload = self
            .uploader
            .upload_file(uid, file, AVATAR_PREFIX, Some(uid))
            .await
            .map_err(|e| {
                tracing::error!(uid, error = %e, "Error uploading avatar");
                e
            })?;

        let avatar = AvatarUpdate {
            url: upload.url.clone(),
            path: upload.full_path.clone(),
            is_simulated: upload.is_simulated,
        };
        self.db.update_avatar(uid, &avatar).await?;

        self.state.send_if_modified(|s| {
            if !s.is_current(uid) {
                return false;
            }
            let profile = s.profile.get_or_insert_with(ProfileState::default);
            profile.avatar_url = avatar.url.clone();
            profile.avatar_path = avatar.path.clone();
            true
        });

        Ok(upload.url)
    }

    /// Resolve one of the current user's avatar paths to a URL. Paths that
    /// belong to other users resolve to `None`.
    pub async fn file_url(&self, path: &str) -> Result<Option<String>, AppError> {
        let identity = self.current_identity().ok_or(AppError::Unauthorized)?;
        if !owns_avatar_path(&identity.uid, path) {
            tracing::debug!(uid = %identity.uid, path, "File path not owned by user");
            return Ok(None);
        }
        Ok(self.uploader.get_file_url(path).await)
    }

    /// Release a simulated upload made by the current user.
    pub fn revoke_file(&self, url: &str) -> Result<bool, AppError> {
        let identity = self.current_identity().ok_or(AppError::Unauthorized)?;
        Ok(self.uploader.revoke_local_url(url, &identity.uid))
    }

    /// Merge the supplied fields into the stored profile.
    ///
    /// Returns `Ok(None)` without touching anything when `uid` is empty or
    /// the patch supplies no field.
    pub async fn update_user_profile(
        &self,
        uid: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>, AppError> {
        if uid.trim().is_empty() || patch.is_empty() {
            return Ok(None);
        }
        let _op = self.begin_profile_op();

        self.db.merge_profile(uid, patch).await.map_err(|e| {
            tracing::error!(uid, error = %e, "Error updating profile");
            e
        })?;

        let mut merged = None;
        self.state.send_if_modified(|s| {
            if !s.is_current(uid) {
                return false;
            }
            let state = s.profile.get_or_insert_with(ProfileState::default);
            state.profile.apply(patch);
            merged = Some(state.profile.clone());
            true
        });

        match merged {
            Some(profile) => Ok(Some(profile)),
            None => Ok(self.db.get_user(uid).await?.map(|r| r.profile)),
        }
    }

    /// Read the user record and publish its profile.
    ///
    /// A missing record is `Ok(None)`; read failures propagate.
    pub async fn fetch_user_profile(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        if uid.trim().is_empty() {
            return Ok(None);
        }
        let _op = self.begin_profile_op();

        let record = self.db.get_user(uid).await.map_err(|e| {
            tracing::error!(uid, error = %e, "Error fetching user profile");
            e
        })?;
        let Some(record) = record else {
            return Ok(None);
        };

        let profile = record.profile_state();
        self.state.send_if_modified(|s| {
            if s.is_current(uid) {
                s.profile = Some(profile);
                true
            } else {
                false
            }
        });

        Ok(Some(record))
    }

    // ─── Internals ───────────────────────────────────────────────

    fn begin_profile_op(&self) -> ProfileOp<'_> {
        self.profile_ops.fetch_add(1, Ordering::SeqCst);
        self.publish_profile_loading();
        ProfileOp { store: self }
    }

    fn publish_profile_loading(&self) {
        self.state.send_if_modified(|s| {
            let loading = self.profile_ops.load(Ordering::SeqCst) > 0;
            if s.profile_loading == loading {
                return false;
            }
            s.profile_loading = loading;
            true
        });
    }

    /// Handle one auth-state emission.
    async fn resolve_identity(&self, identity: Option<Identity>) {
        self.state.send_modify(|s| {
            let same_user = match (&s.identity, &identity) {
                (Some(old), Some(new)) => old.uid == new.uid,
                _ => false,
            };
            if !same_user {
                s.role = None;
                s.profile = None;
            }
            s.identity = identity.clone();
        });

        let Some(identity) = identity else {
            return;
        };

        let (role, profile) = self.load_or_repair(&identity).await;
        self.state.send_if_modified(|s| {
            if !s.is_current(&identity.uid) {
                // Signed out or switched users while resolving
                return false;
            }
            s.role = Some(role);
            s.profile = Some(profile);
            true
        });
    }

    async fn load_or_repair(&self, identity: &Identity) -> (Role, ProfileState) {
        let uid = identity.uid.as_str();

        match self.db.get_user(uid).await {
            Ok(Some(record)) => (record.role, record.profile_state()),
            Ok(None) => {
                let record = UserRecord::new_default(
                    &identity.email,
                    identity.display_name.as_deref().unwrap_or_default(),
                    now_rfc3339(),
                );
                match self.db.create_user_if_absent(uid, &record).await {
                    Ok(true) => {
                        tracing::info!(uid, "Created missing user record");
                        (record.role, record.profile_state())
                    }
                    Ok(false) => {
                        // Created concurrently (e.g. by signup); use what is there now
                        match self.db.get_user(uid).await {
                            Ok(Some(existing)) => (existing.role, existing.profile_state()),
                            _ => (Role::Free, ProfileState::default()),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(uid, error = %e, "Failed to create missing user record");
                        (Role::Free, ProfileState::default())
                    }
                }
            }
            Err(e) => {
                tracing::warn!(uid, error = %e, "Error fetching user data, using defaults");
                (Role::Free, ProfileState::default())
            }
        }
    }

    fn finish_initial_load(&self) {
        self.state.send_if_modified(|s| {
            if !s.auth_loading {
                return false;
            }
            s.auth_loading = false;
            true
        });
    }
}

/// Listener task. Holds only a weak reference so dropping the store ends it.
async fn follow_auth_changes(
    store: Weak<SessionStore>,
    mut changes: watch::Receiver<Option<Identity>>,
) {
    let mut identity = changes.borrow_and_update().clone();
    loop {
        {
            let Some(store) = store.upgrade() else {
                return;
            };
            store.resolve_identity(identity).await;
            store.finish_initial_load();
        }

        if changes.changed().await.is_err() {
            return;
        }
        identity = changes.borrow_and_update().clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owns_avatar_path() {
        assert!(owns_avatar_path("ada", "avatars/ada"));
        assert!(owns_avatar_path("ada", "avatars/ada-1760000000000"));
        assert!(!owns_avatar_path("ada", "avatars/eve-1760000000000"));
        assert!(!owns_avatar_path("ada", "avatars/adam"));
        assert!(!owns_avatar_path("ada", "avatars/ada-"));
        assert!(!owns_avatar_path("ada", "avatars/ada-x-1760000000000"));
        assert!(!owns_avatar_path("ada", "uploads/ada"));
        assert!(!owns_avatar_path("ada", "avatarsada"));
    }
}
