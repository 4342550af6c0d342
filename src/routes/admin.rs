// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role testing controls.
//!
//! Lets the signed-in user switch their own role. Answers 404 unless
//! `ENABLE_ROLE_CONTROLS` is set.

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentSession;
use crate::models::Role;
use crate::services::promote_to_admin;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/role", post(set_role))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleResponse {
    pub role: Role,
    pub message: String,
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<RoleResponse>> {
    if !state.config.enable_role_controls {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    let uid = session.identity.uid.as_str();

    let role = if request.role == Role::Admin.as_str() {
        // Writes the record directly; the session picks it up on refresh
        promote_to_admin(state.db.as_ref(), uid).await?;
        session.store.refresh().await;
        Role::Admin
    } else {
        session.store.update_user_role(uid, &request.role).await?
    };

    tracing::info!(uid, role = %role, "Role changed from testing controls");
    Ok(Json(RoleResponse {
        role,
        message: format!("Role successfully changed to {}", role.as_str().to_uppercase()),
    }))
}
