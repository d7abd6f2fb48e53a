// Payments and their reward on completion

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::PaymentRepository;
use crate::models::payment::{CreatePaymentRequest, Payment, PaymentStatus};
use crate::models::reward::{GrantSource, RewardGrant};
use crate::services::reward::RewardService;
use crate::utils::{normalize_currency, ServiceError};

pub struct PaymentService {
    payments: Arc<PaymentRepository>,
    rewards: Arc<RewardService>,
}

impl PaymentService {
    pub fn new(payments: Arc<PaymentRepository>, rewards: Arc<RewardService>) -> Self {
        Self { payments, rewards }
    }

    /// Create a pending payment for `user_id`
    pub async fn create(&self, user_id: i64, request: &CreatePaymentRequest) -> Result<Payment, ServiceError> {
        if request.amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        let currency = normalize_currency(&request.currency).map_err(ServiceError::ValidationError)?;
        if let Some(reward_id) = request.reward_id {
            if !self.rewards.exists(reward_id).await {
                return Err(ServiceError::NotFound("Reward"));
            }
        }

        let payment = self
            .payments
            .insert(user_id, request.amount, currency, request.reward_id)
            .await;
        info!(payment_id = payment.id, user_id, "Payment created");
        Ok(payment)
    }

    /// A payment as seen by its owner; anyone else gets not found
    pub async fn get(&self, user_id: i64, id: i64) -> Result<Payment, ServiceError> {
        self.payments
            .find_by_id(id)
            .await
            .filter(|p| p.user_id == user_id)
            .ok_or(ServiceError::NotFound("Payment"))
    }

    pub async fn list_for_user(&self, user_id: i64) -> Vec<Payment> {
        self.payments.list_for_user(user_id).await
    }

    pub async fn list_all(&self) -> Vec<Payment> {
        self.payments.list().await
    }

    /// Complete a pending payment and grant its reward, if any.
    ///
    /// A failed grant puts the payment back to pending so it can be retried.
    pub async fn complete(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<(Payment, Option<RewardGrant>), ServiceError> {
        let payment = self
            .payments
            .transition(id, user_id, PaymentStatus::Pending, PaymentStatus::Completed)
            .await
            .map_err(conflict_on_invalid)?;

        let Some(reward_id) = payment.reward_id else {
            info!(payment_id = id, user_id, "Payment completed");
            return Ok((payment, None));
        };

        match self
            .rewards
            .grant(user_id, reward_id, GrantSource::Payment { payment_id: id })
            .await
        {
            Ok(grant) => {
                info!(payment_id = id, user_id, grant_id = grant.id, "Payment completed");
                Ok((payment, Some(grant)))
            },
            Err(e) => {
                warn!(
                    payment_id = id,
                    user_id,
                    error = %e,
                    "Reward grant failed, reverting payment to pending"
                );
                if let Err(revert) = self
                    .payments
                    .transition(id, user_id, PaymentStatus::Completed, PaymentStatus::Pending)
                    .await
                {
                    warn!(payment_id = id, error = %revert, "Payment revert failed");
                }
                Err(e)
            },
        }
    }

    pub async fn cancel(&self, user_id: i64, id: i64) -> Result<Payment, ServiceError> {
        let payment = self
            .payments
            .transition(id, user_id, PaymentStatus::Pending, PaymentStatus::Cancelled)
            .await
            .map_err(conflict_on_invalid)?;
        info!(payment_id = id, user_id, "Payment cancelled");
        Ok(payment)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.payments.delete(id).await?;
        info!(payment_id = id, "Payment deleted");
        Ok(())
    }
}

/// A transition from the wrong status is a conflict, not bad input
fn conflict_on_invalid(error: crate::db::StoreError) -> ServiceError {
    match error {
        crate::db::StoreError::Invalid(msg) => ServiceError::Conflict(msg),
        other => other.into(),
    }
}
