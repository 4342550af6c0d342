// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod identity;
pub mod payment;
pub mod storage;

pub use admin::promote_to_admin;
pub use identity::{AuthClient, FirebaseAuthClient, IdentityBackend, MemoryIdentityBackend};
pub use payment::{PaymentGateway, PaymentService, SimulatedGateway, StripeClient};
pub use storage::{FileUpload, FileUploader, S3BlobStore};
