// Coupons redeemable for rewards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::reward::RewardGrant;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    /// Stored uppercased
    pub code: String,
    pub reward_id: i64,
    /// `None` means unlimited
    pub max_redemptions: Option<u32>,
    pub redemption_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_redemptions
            .is_some_and(|max| self.redemption_count >= max)
    }
}

/// One user's use of one coupon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponRedemption {
    pub coupon_id: i64,
    pub user_id: i64,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 3, max = 32, message = "Code must be between 3 and 32 characters"))]
    pub code: String,

    #[validate(range(min = 1, message = "rewardId must be positive"))]
    pub reward_id: i64,

    #[validate(range(min = 1, message = "maxRedemptions must be at least 1"))]
    pub max_redemptions: Option<u32>,

    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    #[validate(range(min = 1, message = "rewardId must be positive"))]
    pub reward_id: Option<i64>,

    #[validate(range(min = 1, message = "maxRedemptions must be at least 1"))]
    pub max_redemptions: Option<u32>,

    pub expires_at: Option<DateTime<Utc>>,

    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RedeemCouponRequest {
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponResponse {
    pub coupon_code: String,
    pub grant: RewardGrant,
}
