// Payment records and their status transitions

use chrono::Utc;

use super::memory_store::{MemoryStore, StoreError, Table};
use crate::models::payment::{Payment, PaymentStatus};

#[derive(Debug, Default)]
pub struct PaymentRepository {
    store: MemoryStore<Table<Payment>>,
}

impl PaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        user_id: i64,
        amount: i64,
        currency: String,
        reward_id: Option<i64>,
    ) -> Payment {
        let now = Utc::now();
        let mut table = self.store.write().await;
        table
            .insert_with(|id| Payment {
                id,
                user_id,
                amount,
                currency,
                reward_id,
                status: PaymentStatus::Pending,
                created_at: now,
                updated_at: now,
                completed_at: None,
            })
            .clone()
    }

    pub async fn find_by_id(&self, id: i64) -> Option<Payment> {
        self.store.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Payment> {
        self.store.read().await.values().cloned().collect()
    }

    pub async fn list_for_user(&self, user_id: i64) -> Vec<Payment> {
        self.store
            .read()
            .await
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Move a payment owned by `user_id` from `from` to `to`.
    ///
    /// A payment owned by someone else is reported as not found.
    pub async fn transition(
        &self,
        id: i64,
        user_id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Payment, StoreError> {
        let mut table = self.store.write().await;
        let payment = table
            .get_mut(id)
            .filter(|p| p.user_id == user_id)
            .ok_or(StoreError::NotFound("Payment"))?;

        if payment.status != from {
            return Err(StoreError::Invalid(format!(
                "payment is {}, expected {}",
                payment.status, from
            )));
        }

        let now = Utc::now();
        payment.status = to;
        payment.updated_at = now;
        payment.completed_at = match to {
            PaymentStatus::Completed => Some(now),
            _ => None,
        };
        Ok(payment.clone())
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.store
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Payment"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions() {
        let repo = PaymentRepository::new();
        let payment = repo.insert(1, 500, "USD".into(), None).await;
        assert_eq!(payment.status, PaymentStatus::Pending);

        let done = repo
            .transition(payment.id, 1, PaymentStatus::Pending, PaymentStatus::Completed)
            .await
            .expect("complete");
        assert!(done.completed_at.is_some());

        assert!(matches!(
            repo.transition(payment.id, 1, PaymentStatus::Pending, PaymentStatus::Cancelled)
                .await,
            Err(StoreError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_payment_is_not_found() {
        let repo = PaymentRepository::new();
        let payment = repo.insert(1, 500, "USD".into(), None).await;

        assert_eq!(
            repo.transition(payment.id, 2, PaymentStatus::Pending, PaymentStatus::Cancelled)
                .await,
            Err(StoreError::NotFound("Payment"))
        );
    }
}
