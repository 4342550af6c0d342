// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Base App API Server
//!
//! Serves signup, login, profile, avatar and subscription endpoints backed by
//! Firebase Auth, Firestore and S3-compatible storage, or by in-memory
//! backends for local development.

use base_app::{
    config::Config,
    db::{FirestoreDb, MemoryDb, UserRecordStore},
    middleware::auth::SESSION_TTL,
    services::{
        FileUploader, FirebaseAuthClient, IdentityBackend, MemoryIdentityBackend,
        PaymentService, S3BlobStore, StripeClient,
    },
    session::SessionRegistry,
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle sessions are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        local_backend = config.local_backend,
        simulate_uploads = config.simulate_uploads,
        "Starting Base App API"
    );

    // Identity provider and user records
    let (identity, db): (Arc<dyn IdentityBackend>, Arc<dyn UserRecordStore>) =
        if config.local_backend {
            tracing::warn!("Using in-memory identity and user records (local backend)");
            (
                Arc::new(MemoryIdentityBackend::new()),
                Arc::new(MemoryDb::new()),
            )
        } else {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            (
                Arc::new(FirebaseAuthClient::new(config.firebase_api_key.clone())),
                Arc::new(db),
            )
        };

    // Blob storage; simulation mode keeps uploads in memory
    let uploader = if config.simulate_uploads {
        tracing::info!("Upload simulation enabled");
        FileUploader::simulated(&config.public_url)
    } else {
        let store = S3BlobStore::new(&config.storage).await?;
        tracing::info!(bucket = %config.storage.bucket, "Object storage initialized");
        FileUploader::new(Some(Arc::new(store)), false, &config.public_url)
    };

    let payments = match &config.stripe_secret_key {
        Some(key) => {
            tracing::info!("Stripe payment verification enabled");
            PaymentService::new(Arc::new(StripeClient::new(key.clone())))
        }
        None => {
            tracing::info!("Using simulated payment gateway");
            PaymentService::simulated()
        }
    };

    // Build shared state
    let state = Arc::new(AppState {
        sessions: SessionRegistry::new(config.jwt_signing_key.clone()),
        config: config.clone(),
        db,
        identity,
        uploader: Arc::new(uploader),
        payments,
    });

    // Sweep sessions whose tokens can no longer be valid
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.sessions.prune_idle(SESSION_TTL);
        }
    });

    // Build router
    let app = base_app::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("base_app=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
