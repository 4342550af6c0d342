// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription page and payment submission.

use crate::error::Result;
use crate::middleware::auth::CurrentSession;
use crate::models::Role;
use crate::services::payment::{Plan, PlanId, SubscriptionOutcome, PLANS};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payment", get(payment_page).post(subscribe))
        .route("/payment/cancel", post(cancel))
}

#[derive(Serialize)]
pub struct PaymentView {
    pub role: Role,
    /// Subscribers manage their plan instead of picking one
    pub subscribed: bool,
    pub plans: Vec<Plan>,
    pub default_plan: PlanId,
}

async fn payment_page(Extension(session): Extension<CurrentSession>) -> Json<PaymentView> {
    let role = session.store.snapshot().role.unwrap_or_default();
    let subscribed = role == Role::Subscriber;

    Json(PaymentView {
        role,
        subscribed,
        plans: if subscribed { Vec::new() } else { PLANS.to_vec() },
        default_plan: PlanId::Monthly,
    })
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default = "default_plan")]
    pub plan: PlanId,
    pub payment_method_id: String,
}

fn default_plan() -> PlanId {
    PlanId::Monthly
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscriptionOutcome>> {
    let outcome = state
        .payments
        .subscribe(&session.store, request.plan, &request.payment_method_id)
        .await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CancelResponse {
    pub success: bool,
    pub role: Role,
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<CancelResponse>> {
    let role = state.payments.cancel(&session.store).await?;
    Ok(Json(CancelResponse {
        success: true,
        role,
    }))
}
