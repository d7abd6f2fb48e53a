// Coupons and their per-user redemptions

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use super::memory_store::{MemoryStore, StoreError, Table};
use crate::models::coupon::{Coupon, CouponRedemption};

/// Why a coupon could not be claimed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon has no redemptions left")]
    Exhausted,

    #[error("Coupon already redeemed by this user")]
    AlreadyRedeemed,
}

#[derive(Debug, Default)]
pub struct CouponTables {
    coupons: Table<Coupon>,
    redemptions: Vec<CouponRedemption>,
    /// (coupon id, user id)
    redeemed: HashSet<(i64, i64)>,
}

#[derive(Debug, Default)]
pub struct CouponRepository {
    store: MemoryStore<CouponTables>,
}

/// Fields of a new coupon; `code` must already be normalized
pub struct NewCoupon {
    pub code: String,
    pub reward_id: i64,
    pub max_redemptions: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, new: NewCoupon) -> Result<Coupon, StoreError> {
        let mut tables = self.store.write().await;
        if tables.coupons.values().any(|c| c.code == new.code) {
            return Err(StoreError::Duplicate("Coupon code"));
        }

        let now = Utc::now();
        let coupon = tables.coupons.insert_with(|id| Coupon {
            id,
            code: new.code,
            reward_id: new.reward_id,
            max_redemptions: new.max_redemptions,
            redemption_count: 0,
            expires_at: new.expires_at,
            active: true,
            created_at: now,
            updated_at: now,
        });
        Ok(coupon.clone())
    }

    pub async fn find_by_id(&self, id: i64) -> Option<Coupon> {
        self.store.read().await.coupons.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Coupon> {
        self.store.read().await.coupons.values().cloned().collect()
    }

    pub async fn update<F>(&self, id: i64, change: F) -> Result<Coupon, StoreError>
    where
        F: FnOnce(&mut Coupon),
    {
        let mut tables = self.store.write().await;
        let coupon = tables
            .coupons
            .get_mut(id)
            .ok_or(StoreError::NotFound("Coupon"))?;
        change(coupon);
        coupon.updated_at = Utc::now();
        Ok(coupon.clone())
    }

    /// Remove a coupon together with its redemption records
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.store.write().await;
        tables
            .coupons
            .remove(id)
            .ok_or(StoreError::NotFound("Coupon"))?;
        tables.redemptions.retain(|r| r.coupon_id != id);
        tables.redeemed.retain(|(coupon_id, _)| *coupon_id != id);
        Ok(())
    }

    /// Check every redemption rule and, if they all pass, record the use.
    ///
    /// Checks run in order: exists, active, not expired, not exhausted, not
    /// already redeemed by `user_id`.
    pub async fn claim(
        &self,
        code: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Coupon, ClaimError> {
        let mut tables = self.store.write().await;

        let coupon_id = tables
            .coupons
            .values()
            .find(|c| c.code == code)
            .map(|c| c.id)
            .ok_or(ClaimError::NotFound)?;
        let already = tables.redeemed.contains(&(coupon_id, user_id));

        let coupon = tables
            .coupons
            .get_mut(coupon_id)
            .ok_or(ClaimError::NotFound)?;
        if !coupon.active {
            return Err(ClaimError::Inactive);
        }
        if coupon.is_expired_at(now) {
            return Err(ClaimError::Expired);
        }
        if coupon.is_exhausted() {
            return Err(ClaimError::Exhausted);
        }
        if already {
            return Err(ClaimError::AlreadyRedeemed);
        }

        coupon.redemption_count += 1;
        let claimed = coupon.clone();

        tables.redeemed.insert((coupon_id, user_id));
        tables.redemptions.push(CouponRedemption {
            coupon_id,
            user_id,
            redeemed_at: now,
        });
        Ok(claimed)
    }

    /// Undo a successful `claim` whose follow-up grant failed
    pub async fn release(&self, coupon_id: i64, user_id: i64) {
        let mut tables = self.store.write().await;
        if !tables.redeemed.remove(&(coupon_id, user_id)) {
            return;
        }
        tables
            .redemptions
            .retain(|r| !(r.coupon_id == coupon_id && r.user_id == user_id));
        if let Some(coupon) = tables.coupons.get_mut(coupon_id) {
            coupon.redemption_count = coupon.redemption_count.saturating_sub(1);
        }
    }

    pub async fn redemptions_for_user(&self, user_id: i64) -> Vec<CouponRedemption> {
        self.store
            .read()
            .await
            .redemptions
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}
