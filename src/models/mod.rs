// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod profile;
pub mod role;
pub mod user;

pub use profile::{Profile, ProfilePatch, ProfileState};
pub use role::Role;
pub use user::{Identity, UserRecord};
