// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client session state and the server-side session registry.

pub mod registry;
pub mod store;

pub use registry::SessionRegistry;
pub use store::{SessionState, SessionStore};
