// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User identity and the persisted user record.

use super::profile::{Profile, ProfileState};
use super::role::{deserialize_role_or_free, Role};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Authenticated user handle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// User document stored in Firestore (`users/{uid}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_role_or_free")]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub avatar_path: String,
    /// Avatar was stored by the local upload simulation
    #[serde(default)]
    pub avatar_is_simulated: bool,
    #[serde(default)]
    pub profile: Profile,
    /// When the record was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// Last role change (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserRecord {
    /// Default record for a new identity: free role, empty profile.
    pub fn new_default(email: &str, name: &str, created_at: String) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            role: Role::Free,
            avatar_url: String::new(),
            avatar_path: String::new(),
            avatar_is_simulated: false,
            profile: Profile::default(),
            created_at,
            updated_at: None,
        }
    }

    /// In-memory profile view of this record.
    pub fn profile_state(&self) -> ProfileState {
        ProfileState {
            avatar_url: self.avatar_url.clone(),
            avatar_path: self.avatar_path.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format_is_camel_case() {
        let record = UserRecord::new_default("a@b.com", "Name", "2026-01-01T00:00:00Z".into());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["role"], "free");
        assert_eq!(json["avatarUrl"], "");
        assert_eq!(json["createdAt"], "2026-01-01T00:00:00Z");
        assert_eq!(json["profile"]["interests"], serde_json::json!([]));
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_sparse_record_normalizes() {
        let record: UserRecord =
            serde_json::from_str(r#"{"email":"a@b.com","role":"subscriber"}"#).unwrap();

        assert_eq!(record.role, Role::Subscriber);
        assert_eq!(record.profile, Profile::default());
        assert_eq!(record.profile_state().avatar_url, "");
    }
}
