// Coupon management and redemption

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{ClaimError, CouponRepository, NewCoupon};
use crate::models::coupon::{Coupon, CouponRedemption, CreateCouponRequest, UpdateCouponRequest};
use crate::models::reward::{GrantSource, RewardGrant};
use crate::services::reward::RewardService;
use crate::utils::{normalize_coupon_code, ServiceError};

impl From<ClaimError> for ServiceError {
    fn from(error: ClaimError) -> Self {
        match error {
            ClaimError::NotFound => ServiceError::NotFound("Coupon"),
            ClaimError::Inactive
            | ClaimError::Expired
            | ClaimError::Exhausted
            | ClaimError::AlreadyRedeemed => ServiceError::Conflict(error.to_string()),
        }
    }
}

pub struct CouponService {
    coupons: Arc<CouponRepository>,
    rewards: Arc<RewardService>,
}

impl CouponService {
    pub fn new(coupons: Arc<CouponRepository>, rewards: Arc<RewardService>) -> Self {
        Self { coupons, rewards }
    }

    pub async fn create(&self, request: &CreateCouponRequest) -> Result<Coupon, ServiceError> {
        let code = normalize_coupon_code(&request.code);
        if code.is_empty() {
            return Err(ServiceError::ValidationError(
                "Code cannot be empty".to_string(),
            ));
        }
        if !self.rewards.exists(request.reward_id).await {
            return Err(ServiceError::NotFound("Reward"));
        }

        let coupon = self
            .coupons
            .insert(NewCoupon {
                code,
                reward_id: request.reward_id,
                max_redemptions: request.max_redemptions,
                expires_at: request.expires_at,
            })
            .await?;
        info!(coupon_id = coupon.id, code = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    pub async fn get(&self, id: i64) -> Result<Coupon, ServiceError> {
        self.coupons
            .find_by_id(id)
            .await
            .ok_or(ServiceError::NotFound("Coupon"))
    }

    pub async fn list(&self) -> Vec<Coupon> {
        self.coupons.list().await
    }

    /// Coupons this user has redeemed, oldest first
    pub async fn redemptions_for_user(&self, user_id: i64) -> Vec<CouponRedemption> {
        self.coupons.redemptions_for_user(user_id).await
    }

    pub async fn update(&self, id: i64, request: &UpdateCouponRequest) -> Result<Coupon, ServiceError> {
        if let Some(reward_id) = request.reward_id {
            if !self.rewards.exists(reward_id).await {
                return Err(ServiceError::NotFound("Reward"));
            }
        }

        let coupon = self
            .coupons
            .update(id, |coupon| {
                if let Some(reward_id) = request.reward_id {
                    coupon.reward_id = reward_id;
                }
                if let Some(max) = request.max_redemptions {
                    coupon.max_redemptions = Some(max);
                }
                if let Some(expires_at) = request.expires_at {
                    coupon.expires_at = Some(expires_at);
                }
                if let Some(active) = request.active {
                    coupon.active = active;
                }
            })
            .await?;
        Ok(coupon)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.coupons.delete(id).await?;
        info!(coupon_id = id, "Coupon deleted");
        Ok(())
    }

    /// Redeem a coupon for its reward.
    ///
    /// The coupon use and the reward grant are two separate critical
    /// sections. If the grant fails the coupon use is released again and the
    /// grant error is returned.
    pub async fn redeem(&self, user_id: i64, code: &str) -> Result<(Coupon, RewardGrant), ServiceError> {
        let code = normalize_coupon_code(code);
        let coupon = self.coupons.claim(&code, user_id, Utc::now()).await?;

        match self
            .rewards
            .grant(
                user_id,
                coupon.reward_id,
                GrantSource::Coupon {
                    coupon_id: coupon.id,
                },
            )
            .await
        {
            Ok(grant) => {
                info!(coupon_id = coupon.id, user_id, grant_id = grant.id, "Coupon redeemed");
                Ok((coupon, grant))
            },
            Err(e) => {
                warn!(
                    coupon_id = coupon.id,
                    user_id,
                    error = %e,
                    "Reward grant failed, releasing coupon use"
                );
                self.coupons.release(coupon.id, user_id).await;
                Err(e)
            },
        }
    }
}
