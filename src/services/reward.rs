// Reward definitions and granting
//
// Granting is the end of both the coupon and the payment flow: the user must
// exist, the reward must exist and be active, and the whole item bundle is
// applied to the user's holdings in one step before the grant is recorded.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{RewardRepository, UserRepository};
use crate::models::reward::{
    CreateRewardRequest, GrantSource, Reward, RewardGrant, RewardItem, UpdateRewardRequest,
};
use crate::services::item::ItemService;
use crate::utils::{trim_and_validate_field, ServiceError};

pub struct RewardService {
    rewards: Arc<RewardRepository>,
    users: Arc<UserRepository>,
    items: Arc<ItemService>,
}

impl RewardService {
    pub fn new(
        rewards: Arc<RewardRepository>,
        users: Arc<UserRepository>,
        items: Arc<ItemService>,
    ) -> Self {
        Self {
            rewards,
            users,
            items,
        }
    }

    /// Bundles need at least one line, every quantity at least 1, every item in the catalogue
    async fn check_bundle(&self, lines: &[RewardItem]) -> Result<(), ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "A reward needs at least one item".to_string(),
            ));
        }
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for item {} must be at least 1",
                line.item_id
            )));
        }

        let ids: Vec<i64> = lines.iter().map(|l| l.item_id).collect();
        let missing = self.items.missing_items(&ids).await;
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Unknown item ids: {:?}",
                missing
            )));
        }
        Ok(())
    }

    pub async fn create(&self, request: &CreateRewardRequest) -> Result<Reward, ServiceError> {
        let name =
            trim_and_validate_field(&request.name, "Name", true).map_err(ServiceError::ValidationError)?;
        self.check_bundle(&request.items).await?;

        let reward = self
            .rewards
            .insert(
                name,
                request.description.trim().to_string(),
                request.items.clone(),
                request.active,
            )
            .await;
        info!(reward_id = reward.id, "Reward created");
        Ok(reward)
    }

    pub async fn get(&self, id: i64) -> Result<Reward, ServiceError> {
        self.rewards
            .find_by_id(id)
            .await
            .ok_or(ServiceError::NotFound("Reward"))
    }

    pub async fn exists(&self, id: i64) -> bool {
        self.rewards.exists(id).await
    }

    pub async fn list(&self) -> Vec<Reward> {
        self.rewards.list().await
    }

    pub async fn update(&self, id: i64, request: &UpdateRewardRequest) -> Result<Reward, ServiceError> {
        let name = match &request.name {
            Some(name) => Some(
                trim_and_validate_field(name, "Name", true).map_err(ServiceError::ValidationError)?,
            ),
            None => None,
        };
        if let Some(items) = &request.items {
            self.check_bundle(items).await?;
        }

        let reward = self
            .rewards
            .update(id, |reward| {
                if let Some(name) = name {
                    reward.name = name;
                }
                if let Some(description) = &request.description {
                    reward.description = description.trim().to_string();
                }
                if let Some(items) = &request.items {
                    reward.items = items.clone();
                }
                if let Some(active) = request.active {
                    reward.active = active;
                }
            })
            .await?;
        Ok(reward)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.rewards.delete(id).await?;
        info!(reward_id = id, "Reward deleted");
        Ok(())
    }

    /// Grant a reward to a user.
    ///
    /// Nothing is written unless the whole item bundle is applied.
    pub async fn grant(
        &self,
        user_id: i64,
        reward_id: i64,
        source: GrantSource,
    ) -> Result<RewardGrant, ServiceError> {
        if !self.users.exists(user_id).await {
            return Err(ServiceError::NotFound("User"));
        }

        let reward = self.get(reward_id).await?;
        if !reward.active {
            return Err(ServiceError::Conflict("Reward is not active".to_string()));
        }

        self.items.grant_items(user_id, &reward.items).await?;
        if self.discard_orphaned_holdings(user_id).await {
            return Err(ServiceError::NotFound("User"));
        }
        let grant = self.rewards.record_grant(&reward, user_id, source).await;

        info!(
            grant_id = grant.id,
            reward_id,
            user_id,
            source = ?grant.source,
            "Reward granted"
        );
        Ok(grant)
    }

    pub async fn grants_for_user(&self, user_id: i64) -> Vec<RewardGrant> {
        self.rewards.grants_for_user(user_id).await
    }

    /// A user deleted while their bundle was being applied keeps no holdings.
    /// Relies on user deletion removing the user before clearing holdings.
    async fn discard_orphaned_holdings(&self, user_id: i64) -> bool {
        if self.users.exists(user_id).await {
            return false;
        }
        self.items.clear_holdings(user_id).await;
        warn!(user_id, "User deleted during grant; holdings discarded");
        true
    }
}
