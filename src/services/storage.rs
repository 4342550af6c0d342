// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File uploads to object storage, with an in-memory simulation mode.
//!
//! Simulation mode never contacts the blob store: bytes are kept in process
//! memory and served from `/local-files/{id}` until the URL is revoked.

use crate::config::StorageConfig;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Route prefix for simulated uploads.
pub const LOCAL_FILES_PREFIX: &str = "/local-files";

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub bytes: Bytes,
    pub content_type: String,
    pub original_name: String,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UploadResult {
    pub url: String,
    pub full_path: String,
    pub is_simulated: bool,
}

/// Remote object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;

    /// Durable URL for an existing object.
    async fn object_url(&self, key: &str) -> anyhow::Result<String>;
}

/// S3-compatible object storage (GCS interoperability, MinIO, S3).
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3BlobStore {
    pub async fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn object_url(&self, key: &str) -> anyhow::Result<String> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 head_object")?;
        Ok(public_object_url(&self.public_url, key))
    }
}

/// Join a public base URL and an object key, encoding each key segment.
fn public_object_url(base: &str, key: &str) -> String {
    let encoded: Vec<_> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base, encoded.join("/"))
}

/// A simulated upload held in memory.
#[derive(Debug, Clone)]
pub struct LocalObject {
    /// Uid of the user that uploaded it.
    pub owner: String,
    pub path: String,
    pub url: String,
    pub bytes: Bytes,
    pub content_type: String,
}

/// Upload adapter over a blob store, with explicit simulation mode.
pub struct FileUploader {
    simulate: bool,
    store: Option<Arc<dyn BlobStore>>,
    local_base_url: String,
    /// Simulated path -> URL
    local_urls: DashMap<String, String>,
    /// Simulated object id -> contents
    local_objects: DashMap<Uuid, LocalObject>,
}

impl FileUploader {
    /// `local_base_url` is the public URL of this server; simulated files are
    /// served beneath it.
    pub fn new(store: Option<Arc<dyn BlobStore>>, simulate: bool, local_base_url: &str) -> Self {
        Self {
            simulate,
            store,
            local_base_url: local_base_url.trim_end_matches('/').to_string(),
            local_urls: DashMap::new(),
            local_objects: DashMap::new(),
        }
    }

    /// Simulation-only uploader.
    pub fn simulated(local_base_url: &str) -> Self {
        Self::new(None, true, local_base_url)
    }

    /// Store `file` at `path_prefix/name` (or `path_prefix/<original name>`)
    /// on behalf of `owner`.
    pub async fn upload_file(
        &self,
        owner: &str,
        file: &FileUpload,
        path_prefix: &str,
        name: Option<&str>,
    ) -> Result<UploadResult, AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::InvalidArgument("File is empty".to_string()));
        }
        let file_name = file_name(name.unwrap_or(&file.original_name));
        let prefix = path_prefix.trim_matches('/');

        if self.simulate {
            return Ok(self.store_locally(owner, file, prefix, &file_name));
        }

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AppError::Upload("No blob store configured".to_string()))?;
        let full_path = format!("{}/{}", prefix, file_name);

        store
            .put_object(&full_path, file.bytes.clone(), &file.content_type)
            .await
            .map_err(|e| AppError::Upload(format!("{:#}", e)))?;
        let url = store
            .object_url(&full_path)
            .await
            .map_err(|e| AppError::Upload(format!("{:#}", e)))?;

        tracing::info!(path = %full_path, bytes = file.bytes.len(), "File uploaded");

        Ok(UploadResult {
            url,
            full_path,
            is_simulated: false,
        })
    }

    fn store_locally(
        &self,
        owner: &str,
        file: &FileUpload,
        prefix: &str,
        file_name: &str,
    ) -> UploadResult {
        let millis = chrono::Utc::now().timestamp_millis();
        let full_path = format!("{}/{}-{}", prefix, file_name, millis);
        let id = Uuid::new_v4();
        let url = format!("{}{}/{}", self.local_base_url, LOCAL_FILES_PREFIX, id);

        self.local_objects.insert(
            id,
            LocalObject {
                owner: owner.to_string(),
                path: full_path.clone(),
                url: url.clone(),
                bytes: file.bytes.clone(),
                content_type: file.content_type.clone(),
            },
        );
        self.local_urls.insert(full_path.clone(), url.clone());

        tracing::debug!(path = %full_path, "Simulated upload stored in memory");

        UploadResult {
            url,
            full_path,
            is_simulated: true,
        }
    }

    /// Resolve a stored path to a URL. Failures resolve to `None`.
    pub async fn get_file_url(&self, path: &str) -> Option<String> {
        if self.simulate {
            return self.local_urls.get(path).map(|url| url.clone());
        }

        let store = self.store.as_ref()?;
        match store.object_url(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(path, error = %format!("{:#}", e), "Failed to resolve file URL");
                None
            }
        }
    }

    /// Release a simulated URL uploaded by `owner`. Returns whether anything
    /// was released; other users' uploads are left alone.
    pub fn revoke_local_url(&self, url: &str, owner: &str) -> bool {
        if !self.simulate {
            return false;
        }
        let Some(id) = self.local_id(url) else {
            return false;
        };
        let Some((_, object)) = self
            .local_objects
            .remove_if(&id, |_, object| object.owner == owner)
        else {
            return false;
        };

        self.local_urls
            .remove_if(&object.path, |_, cached| cached == &object.url);
        tracing::debug!(path = %object.path, "Simulated upload revoked");
        true
    }

    /// Contents of a simulated upload, by id.
    pub fn local_file(&self, id: Uuid) -> Option<LocalObject> {
        if !self.simulate {
            return None;
        }
        self.local_objects.get(&id).map(|o| o.clone())
    }

    /// Number of simulated uploads currently held.
    pub fn local_file_count(&self) -> usize {
        self.local_objects.len()
    }

    fn local_id(&self, url: &str) -> Option<Uuid> {
        let prefix = format!("{}{}/", self.local_base_url, LOCAL_FILES_PREFIX);
        url.strip_prefix(&prefix)?.parse().ok()
    }
}

/// Last path segment of a client-supplied name.
fn file_name(name: &str) -> String {
    let name = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "file".to_string()
    } else {
        name.to_string()
    }
}
