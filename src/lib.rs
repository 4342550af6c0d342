// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Base App: account signup and login, roles, profiles and subscriptions
//!
//! This crate provides the backend for a starter web app. Each signed-in
//! client gets a `SessionStore` that follows its auth state and mirrors its
//! role and profile from the user record.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod time_utils;

use config::Config;
use db::UserRecordStore;
use services::{AuthClient, FileUploader, IdentityBackend, PaymentService};
use session::{SessionRegistry, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn UserRecordStore>,
    pub identity: Arc<dyn IdentityBackend>,
    pub uploader: Arc<FileUploader>,
    pub payments: PaymentService,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Start a fresh store for one client, signed out.
    pub fn new_session_store(&self) -> Arc<SessionStore> {
        SessionStore::start(
            AuthClient::new(self.identity.clone()),
            self.db.clone(),
            self.uploader.clone(),
        )
    }
}
