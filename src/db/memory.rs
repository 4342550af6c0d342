// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user record store for local development and tests.

use crate::db::{collections, AvatarUpdate, UserRecordStore};
use crate::error::AppError;
use crate::models::{ProfilePatch, Role, UserRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local record store with the same update semantics as Firestore.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, UserRecord>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a record out-of-band (as an operator deleting the document would).
    pub fn remove_user(&self, uid: &str) -> Option<UserRecord> {
        self.users.remove(uid).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn modify<F>(&self, uid: &str, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut record = self.users.get_mut(uid).ok_or_else(|| {
            AppError::Database(format!(
                "No document to update: {}/{}",
                collections::USERS,
                uid
            ))
        })?;
        f(record.value_mut());
        Ok(())
    }
}

#[async_trait]
impl UserRecordStore for MemoryDb {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.users.get(uid).map(|r| r.clone()))
    }

    async fn set_user(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        self.users.insert(uid.to_string(), record.clone());
        Ok(())
    }

    async fn create_user_if_absent(
        &self,
        uid: &str,
        record: &UserRecord,
    ) -> Result<bool, AppError> {
        match self.users.entry(uid.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn update_role(&self, uid: &str, role: Role, updated_at: &str) -> Result<(), AppError> {
        self.modify(uid, |record| {
            record.role = role;
            record.updated_at = Some(updated_at.to_string());
        })
    }

    async fn update_avatar(&self, uid: &str, avatar: &AvatarUpdate) -> Result<(), AppError> {
        self.modify(uid, |record| {
            record.avatar_url = avatar.url.clone();
            record.avatar_path = avatar.path.clone();
            record.avatar_is_simulated = avatar.is_simulated;
        })
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        self.modify(uid, |record| record.profile.apply(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord::new_default("a@b.com", "A", "2026-01-01T00:00:00Z".to_string())
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let db = MemoryDb::new();
        assert!(db.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let db = MemoryDb::new();
        let err = db
            .update_role("nobody", Role::Admin, "2026-01-02T00:00:00Z")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing() {
        let db = MemoryDb::new();
        let mut named = record();
        named.name = "Kept".to_string();

        assert!(db.create_user_if_absent("u1", &named).await.unwrap());
        assert!(!db.create_user_if_absent("u1", &record()).await.unwrap());
        assert_eq!(db.get_user("u1").await.unwrap().unwrap().name, "Kept");
    }

    #[tokio::test]
    async fn test_update_role_sets_timestamp() {
        let db = MemoryDb::new();
        db.set_user("u1", &record()).await.unwrap();
        db.update_role("u1", Role::Subscriber, "2026-01-02T00:00:00Z")
            .await
            .unwrap();

        let stored = db.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Subscriber);
        assert_eq!(stored.updated_at.as_deref(), Some("2026-01-02T00:00:00Z"));
        assert_eq!(stored.email, "a@b.com");
    }
}
