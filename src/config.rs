// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything that changes backend behavior (local backends, upload
//! simulation, role testing controls) is an explicit field here so that
//! services receive it at construction instead of reading the environment.

use std::env;

/// Object storage settings (S3-compatible API).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL under which stored objects are publicly fetchable
    pub public_url: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Public base URL of this server (used for simulated file URLs)
    pub public_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Firebase Web API key (Identity Toolkit)
    pub firebase_api_key: String,
    /// Server port
    pub port: u16,
    /// Use in-memory identity and record backends instead of Firebase
    pub local_backend: bool,
    /// Keep uploads in memory instead of writing to object storage
    pub simulate_uploads: bool,
    /// Expose the role testing controls (`/admin/role`)
    pub enable_role_controls: bool,
    pub storage: StorageConfig,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Stripe secret key; payments are simulated when absent
    pub stripe_secret_key: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// Offline configuration: in-memory backends, simulated uploads and payments.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            public_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            firebase_api_key: "test_api_key".to_string(),
            port: 8080,
            local_backend: true,
            simulate_uploads: true,
            enable_role_controls: true,
            storage: StorageConfig {
                bucket: "test-bucket".to_string(),
                endpoint: "http://localhost:9000".to_string(),
                region: "us-east-1".to_string(),
                access_key: "test".to_string(),
                secret_key: "test".to_string(),
                public_url: "http://localhost:9000/test-bucket".to_string(),
            },
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            stripe_secret_key: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        let local_backend = env_flag("LOCAL_BACKEND");

        let firebase_api_key = match env::var("FIREBASE_API_KEY") {
            Ok(key) => key.trim().to_string(),
            Err(_) if local_backend => String::new(),
            Err(_) => return Err(ConfigError::Missing("FIREBASE_API_KEY")),
        };

        let endpoint = env::var("STORAGE_ENDPOINT")
            .unwrap_or_else(|_| "https://storage.googleapis.com".to_string());
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "base-app-uploads".to_string());
        let storage = StorageConfig {
            public_url: env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket)),
            region: env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            access_key: env::var("STORAGE_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("STORAGE_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            endpoint,
            bucket,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            firebase_api_key,
            port,
            local_backend,
            simulate_uploads: env_flag("UPLOAD_SIMULATION"),
            enable_role_controls: env_flag("ENABLE_ROLE_CONTROLS"),
            storage,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Boolean environment flag: `1`, `true` or `yes` (any case).
fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_API_KEY", "test_api_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("UPLOAD_SIMULATION", "true");
        env::set_var("STORAGE_BUCKET", "avatars-bucket");
        env::remove_var("STORAGE_PUBLIC_URL");
        env::remove_var("STORAGE_ENDPOINT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_api_key, "test_api_key");
        assert!(config.simulate_uploads);
        assert_eq!(
            config.storage.public_url,
            "https://storage.googleapis.com/avatars-bucket"
        );
        assert!(config.stripe_secret_key.is_none() || env::var("STRIPE_SECRET_KEY").is_ok());
    }

    #[test]
    fn test_default_is_offline() {
        let config = Config::default();
        assert!(config.local_backend);
        assert!(config.simulate_uploads);
        assert!(config.stripe_secret_key.is_none());
    }
}
