// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization roles.

use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Authorization level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Free,
    Subscriber,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Free, Role::Subscriber, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Free => "free",
            Role::Subscriber => "subscriber",
            Role::Admin => "admin",
        }
    }

    /// Paid features: subscribers and admins.
    pub fn is_subscriber(&self) -> bool {
        matches!(self, Role::Subscriber | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Badge label shown on the dashboard.
    pub fn badge(&self) -> &'static str {
        match self {
            Role::Free => "Free User",
            Role::Subscriber => "Subscriber",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Role::Free),
            "subscriber" => Ok(Role::Subscriber),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::InvalidArgument(format!("Invalid role: {}", other))),
        }
    }
}

/// Deserialize a stored role, falling back to `Free` for anything unreadable.
///
/// Used on persisted records so a corrupted or hand-edited role never locks a
/// user out of the app.
pub fn deserialize_role_or_free<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}
