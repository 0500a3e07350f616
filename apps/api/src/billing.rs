//! Subscription path. The payment processor is an external collaborator
//! behind a small trait; the core only records its customer id and applies
//! the tier's credit allowance.

use async_trait::async_trait;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::auth::AuthedUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::models::{ActivityEvent, Tier};

/// External payment processor boundary. `create_subscription` returns the
/// processor's customer id on success.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_subscription(
        &self,
        email: &str,
        tier: Tier,
        payment_method: &str,
    ) -> anyhow::Result<String>;
}

/// Development processor: accepts every request and derives a stable
/// customer id from the email. No money moves.
pub struct OfflinePaymentProcessor;

#[async_trait]
impl PaymentProcessor for OfflinePaymentProcessor {
    async fn create_subscription(
        &self,
        email: &str,
        tier: Tier,
        _payment_method: &str,
    ) -> anyhow::Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(email.to_lowercase());
        let digest = format!("{:x}", hasher.finalize());
        info!(tier = %tier, "Offline subscription created");
        Ok(format!("cus_{}", &digest[..16]))
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub tier: String,
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub tier: Tier,
    pub credits: i64,
}

/// POST /subscribe
pub async fn handle_subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let tier = match Tier::parse(&req.tier) {
        Some(t @ (Tier::Starter | Tier::Growth | Tier::Enterprise)) => t,
        _ => {
            return Err(AppError::Validation(format!(
                "Invalid tier '{}': must be one of starter, growth, enterprise",
                req.tier
            )))
        }
    };
    if req.payment_method.trim().is_empty() {
        return Err(AppError::Validation(
            "payment_method is required".to_string(),
        ));
    }

    let record = state
        .store
        .get_user(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let customer_id = state
        .payments
        .create_subscription(&record.email, tier, &req.payment_method)
        .await
        .map_err(|e| AppError::Validation(format!("Subscription failed: {e}")))?;

    let credits = tier.credit_allowance();
    let updated = state
        .store
        .set_user_subscription(&user.id, tier.as_str(), credits, &customer_id)
        .await?;

    state
        .store
        .record_activity(
            &user.id,
            ActivityEvent::Subscribe,
            serde_json::json!({ "tier": tier.as_str(), "credits": credits }),
        )
        .await;

    Ok(Json(SubscribeResponse {
        success: true,
        tier,
        credits: updated.credits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_processor_is_deterministic() {
        let processor = OfflinePaymentProcessor;
        let a = processor
            .create_subscription("user@example.com", Tier::Starter, "pm_1")
            .await
            .unwrap();
        let b = processor
            .create_subscription("USER@example.com", Tier::Growth, "pm_2")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("cus_"));
    }
}
