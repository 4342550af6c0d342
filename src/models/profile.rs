// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-editable profile and partial updates.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Descriptive profile stored under `profile` in the user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(default)]
pub struct Profile {
    pub bio: String,
    pub location: String,
    pub occupation: String,
    pub website: String,
    pub interests: Vec<String>,
}

impl Profile {
    /// Overwrite only the fields supplied in `patch`.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(bio) = &patch.bio {
            self.bio = bio.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(occupation) = &patch.occupation {
            self.occupation = occupation.clone();
        }
        if let Some(website) = &patch.website {
            self.website = website.clone();
        }
        if let Some(interests) = &patch.interests {
            self.interests = normalize_interests(interests);
        }
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none()
            && self.location.is_none()
            && self.occupation.is_none()
            && self.website.is_none()
            && self.interests.is_none()
    }

    /// Firestore field paths touched by this patch, e.g. `profile.bio`.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.bio.is_some() {
            paths.push("profile.bio");
        }
        if self.location.is_some() {
            paths.push("profile.location");
        }
        if self.occupation.is_some() {
            paths.push("profile.occupation");
        }
        if self.website.is_some() {
            paths.push("profile.website");
        }
        if self.interests.is_some() {
            paths.push("profile.interests");
        }
        paths
    }
}

/// Avatar plus profile, as held in session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileState {
    pub avatar_url: String,
    pub avatar_path: String,
    pub profile: Profile,
}

/// Trim interests and drop empty entries.
pub fn normalize_interests(interests: &[String]) -> Vec<String> {
    interests
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the comma-separated interests field of the profile form.
pub fn parse_interests(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
