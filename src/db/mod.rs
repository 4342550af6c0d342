// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, or in-memory for local development).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{ProfilePatch, Role, UserRecord};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Avatar fields written after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpdate {
    pub url: String,
    pub path: String,
    pub is_simulated: bool,
}

/// Persistence for user records, keyed by identity uid.
///
/// Update operations require the record to exist; `set_user` creates or
/// replaces it.
#[async_trait]
pub trait UserRecordStore: Send + Sync {
    /// Read a record. A missing record is `Ok(None)`, not an error.
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError>;

    /// Create or replace a record.
    async fn set_user(&self, uid: &str, record: &UserRecord) -> Result<(), AppError>;

    /// Create a record unless one exists. Returns whether it was created.
    async fn create_user_if_absent(&self, uid: &str, record: &UserRecord)
        -> Result<bool, AppError>;

    /// Write `role` and `updatedAt`.
    async fn update_role(&self, uid: &str, role: Role, updated_at: &str) -> Result<(), AppError>;

    /// Write `avatarUrl`, `avatarPath` and `avatarIsSimulated`.
    async fn update_avatar(&self, uid: &str, avatar: &AvatarUpdate) -> Result<(), AppError>;

    /// Write only the `profile.*` fields present in `patch`.
    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError>;
}
