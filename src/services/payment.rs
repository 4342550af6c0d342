// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription plans and payment-method verification.
//!
//! Card details are tokenized client-side; the server only sees a payment
//! method id. The charge itself is simulated. A verified payment method moves
//! the user to `subscriber`.

use crate::error::AppError;
use crate::models::Role;
use crate::session::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Monthly,
    Annual,
}

/// A subscription plan offered on the payment page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    /// Price in cents
    pub price_cents: u32,
    pub interval: &'static str,
    pub description: &'static str,
}

pub const PLANS: [Plan; 2] = [
    Plan {
        id: PlanId::Monthly,
        name: "Monthly Subscription",
        price_cents: 999,
        interval: "month",
        description: "Get access to all premium features",
    },
    Plan {
        id: PlanId::Annual,
        name: "Annual Subscription",
        price_cents: 9999,
        interval: "year",
        description: "Save 17% compared to monthly billing",
    },
];

impl Plan {
    pub fn find(id: PlanId) -> &'static Plan {
        match id {
            PlanId::Monthly => &PLANS[0],
            PlanId::Annual => &PLANS[1],
        }
    }

    /// Price as shown to the user, e.g. `$9.99`.
    pub fn display_price(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Confirms that a client-side tokenized payment method is usable.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify_payment_method(&self, payment_method_id: &str, email: &str)
        -> Result<(), AppError>;
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethod {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, "https://api.stripe.com".to_string())
    }

    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn verify_payment_method(
        &self,
        payment_method_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/v1/payment_methods/{}",
            self.base_url,
            urlencoding::encode(payment_method_id)
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Payment provider unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(status = %status, message = %message, "Payment method rejected");
            return Err(AppError::Payment(message));
        }

        let method: StripePaymentMethod = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Invalid provider response: {}", e)))?;

        tracing::info!(
            payment_method = %method.id,
            kind = %method.kind,
            email,
            "Payment method verified"
        );
        Ok(())
    }
}

/// Accepts any id that looks like a Stripe payment method.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn verify_payment_method(
        &self,
        payment_method_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        if !payment_method_id.starts_with("pm_") {
            return Err(AppError::Payment(format!(
                "Invalid payment method: {}",
                payment_method_id
            )));
        }
        tracing::info!(payment_method = payment_method_id, email, "Simulated payment accepted");
        Ok(())
    }
}

/// Result of a successful payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export))]
pub struct SubscriptionOutcome {
    pub plan: PlanId,
    pub amount: String,
    /// False when the payment went through but the role write failed
    pub role_updated: bool,
    pub role: Role,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub fn simulated() -> Self {
        Self::new(Arc::new(SimulatedGateway))
    }

    /// Verify the payment method and upgrade the signed-in user.
    pub async fn subscribe(
        &self,
        store: &SessionStore,
        plan: PlanId,
        payment_method_id: &str,
    ) -> Result<SubscriptionOutcome, AppError> {
        let identity = store.current_identity().ok_or(AppError::Unauthorized)?;
        let payment_method_id = payment_method_id.trim();
        if payment_method_id.is_empty() {
            return Err(AppError::InvalidArgument(
                "Payment method is required".to_string(),
            ));
        }

        let plan = Plan::find(plan);
        self.gateway
            .verify_payment_method(payment_method_id, &identity.email)
            .await?;

        let role_updated = match store
            .update_user_role(&identity.uid, Role::Subscriber.as_str())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(uid = %identity.uid, error = %e, "Payment succeeded but role update failed");
                false
            }
        };

        let role = store.snapshot().role.unwrap_or_default();
        tracing::info!(uid = %identity.uid, plan = ?plan.id, role_updated, "Subscription processed");

        Ok(SubscriptionOutcome {
            plan: plan.id,
            amount: plan.display_price(),
            role_updated,
            role,
        })
    }

    /// Move the signed-in user back to `free`.
    pub async fn cancel(&self, store: &SessionStore) -> Result<Role, AppError> {
        let identity = store.current_identity().ok_or(AppError::Unauthorized)?;
        let role = store
            .update_user_role(&identity.uid, Role::Free.as_str())
            .await?;
        tracing::info!(uid = %identity.uid, "Subscription cancelled");
        Ok(role)
    }
}
