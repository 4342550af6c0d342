// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations on `users/{uid}`.
//!
//! Partial writes use field masks so concurrent updates to different fields
//! of the same record do not clobber each other.

use crate::db::{collections, AvatarUpdate, UserRecordStore};
use crate::error::AppError;
use crate::models::{Profile, ProfilePatch, Role, UserRecord};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleFields {
    role: Role,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvatarFields {
    avatar_url: String,
    avatar_path: String,
    avatar_is_simulated: bool,
}

#[derive(Serialize, Deserialize)]
struct ProfileFields {
    profile: Profile,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Masked update of an existing user document.
    async fn update_fields<T>(&self, uid: &str, fields: &[&str], object: &T) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserRecordStore for FirestoreDb {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_user(&self, uid: &str, record: &UserRecord) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn create_user_if_absent(
        &self,
        uid: &str,
        record: &UserRecord,
    ) -> Result<bool, AppError> {
        let created: Result<UserRecord, _> = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(uid)
            .object(record)
            .execute()
            .await;

        match created {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn update_role(&self, uid: &str, role: Role, updated_at: &str) -> Result<(), AppError> {
        let fields = RoleFields {
            role,
            updated_at: updated_at.to_string(),
        };
        self.update_fields(uid, &["role", "updatedAt"], &fields)
            .await?;
        tracing::debug!(uid, role = %role, "Role written");
        Ok(())
    }

    async fn update_avatar(&self, uid: &str, avatar: &AvatarUpdate) -> Result<(), AppError> {
        let fields = AvatarFields {
            avatar_url: avatar.url.clone(),
            avatar_path: avatar.path.clone(),
            avatar_is_simulated: avatar.is_simulated,
        };
        self.update_fields(
            uid,
            &["avatarUrl", "avatarPath", "avatarIsSimulated"],
            &fields,
        )
        .await
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        let paths = patch.field_paths();
        if paths.is_empty() {
            return Ok(());
        }

        // Only the masked paths are written, so the rest of this object is ignored.
        let mut profile = Profile::default();
        profile.apply(patch);

        self.update_fields(uid, &paths, &ProfileFields { profile })
            .await
    }
}
