// Rewards: bundles of items granted to users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One line of a reward bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardItem {
    pub item_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub items: Vec<RewardItem>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What caused a reward to be granted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GrantSource {
    #[serde(rename_all = "camelCase")]
    Coupon { coupon_id: i64 },
    #[serde(rename_all = "camelCase")]
    Payment { payment_id: i64 },
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RewardGrant {
    pub id: i64,
    pub reward_id: i64,
    pub user_id: i64,
    pub source: GrantSource,
    pub items: Vec<RewardItem>,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "A reward needs at least one item"))]
    pub items: Vec<RewardItem>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "A reward needs at least one item"))]
    pub items: Option<Vec<RewardItem>>,

    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantRewardRequest {
    #[validate(range(min = 1, message = "userId must be positive"))]
    pub user_id: i64,
}
