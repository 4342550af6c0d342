// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile editing, avatar upload and file URL routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentSession;
use crate::models::profile::parse_interests;
use crate::models::{Profile, ProfilePatch, ProfileState, Role};
use crate::services::storage::FileUpload;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Largest accepted avatar, in bytes.
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Profile routes (require a session; the guard is applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/profile/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES)),
        )
        .route("/files/revoke", post(revoke_file))
        .route("/files/{*path}", get(get_file))
}

/// Simulated uploads are served without a session, like public bucket URLs.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/local-files/{id}", get(get_local_file))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar_url: String,
    pub profile: Profile,
    pub profile_loading: bool,
}

async fn get_profile(
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<ProfileResponse>> {
    let uid = session.identity.uid.as_str();
    let record = session
        .store
        .fetch_user_profile(uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    Ok(Json(ProfileResponse {
        email: record.email,
        name: record.name,
        role: record.role,
        avatar_url: record.avatar_url,
        profile: record.profile,
        profile_loading: session.store.snapshot().profile_loading,
    }))
}

/// Interests arrive either as a list or as the comma-separated form field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InterestsInput {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub interests: Option<InterestsInput>,
}

impl From<ProfileUpdateRequest> for ProfilePatch {
    fn from(request: ProfileUpdateRequest) -> Self {
        ProfilePatch {
            bio: request.bio,
            location: request.location,
            occupation: request.occupation,
            website: request.website,
            interests: request.interests.map(|input| match input {
                InterestsInput::List(list) => list,
                InterestsInput::Text(text) => parse_interests(&text),
            }),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileUpdateResponse {
    pub updated: bool,
    pub profile: Option<Profile>,
}

async fn update_profile(
    Extension(session): Extension<CurrentSession>,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileUpdateResponse>> {
    let patch = ProfilePatch::from(request);
    let profile = session
        .store
        .update_user_profile(&session.identity.uid, &patch)
        .await?;

    Ok(Json(ProfileUpdateResponse {
        updated: profile.is_some(),
        profile,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AvatarParams {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AvatarResponse {
    pub avatar_url: String,
    pub profile: Option<ProfileState>,
}

/// Upload the raw request body as the user's avatar.
async fn upload_avatar(
    Extension(session): Extension<CurrentSession>,
    Query(params): Query<AvatarParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AvatarResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(AppError::InvalidArgument(format!(
            "Avatar must be an image, got {}",
            content_type
        )));
    }

    let file = FileUpload {
        bytes: body,
        content_type,
        original_name: params.filename.unwrap_or_else(|| "avatar".to_string()),
    };
    let avatar_url = session
        .store
        .upload_avatar(&file, &session.identity.uid)
        .await?;

    Ok(Json(AvatarResponse {
        avatar_url,
        profile: session.store.snapshot().profile,
    }))
}

/// Redirect to the URL one of the caller's stored paths resolves to.
async fn get_file(
    Extension(session): Extension<CurrentSession>,
    Path(path): Path<String>,
) -> Result<Redirect> {
    match session.store.file_url(&path).await? {
        Some(url) => Ok(Redirect::temporary(&url)),
        None => Err(AppError::NotFound(format!("File {} not found", path))),
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub url: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RevokeResponse {
    pub revoked: bool,
}

async fn revoke_file(
    Extension(session): Extension<CurrentSession>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    Ok(Json(RevokeResponse {
        revoked: session.store.revoke_file(&request.url)?,
    }))
}

async fn get_local_file(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let object = id
        .parse::<Uuid>()
        .ok()
        .and_then(|id| state.uploader.local_file(id));

    match object {
        Some(object) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, object.content_type),
                (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
            ],
            object.bytes,
        )
            .into_response(),
        None => AppError::NotFound("File not found".to_string()).into_response(),
    }
}
