// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role escalation for development and testing.
//!
//! `promote_to_admin` writes straight to the user record and does not go
//! through `SessionStore::update_user_role`; the in-memory session state of
//! the promoted user is only updated by a later refresh. It is reachable
//! solely through the role testing controls, which are off unless
//! `ENABLE_ROLE_CONTROLS` is set.

use crate::db::UserRecordStore;
use crate::error::AppError;
use crate::models::Role;
use crate::time_utils::now_rfc3339;

/// Set `role = admin` and `updatedAt = now` on the record for `uid`.
pub async fn promote_to_admin(db: &dyn UserRecordStore, uid: &str) -> Result<(), AppError> {
    if uid.trim().is_empty() {
        return Err(AppError::InvalidArgument("User ID is required".to_string()));
    }

    let now = now_rfc3339();
    db.update_role(uid, Role::Admin, &now).await.map_err(|e| {
        tracing::error!(uid, error = %e, "Error promoting user to admin");
        e
    })?;

    tracing::warn!(uid, "User promoted to admin via role testing controls");
    Ok(())
}
