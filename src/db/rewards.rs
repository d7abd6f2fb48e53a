// Reward definitions and the grant ledger

use chrono::Utc;

use super::memory_store::{MemoryStore, StoreError, Table};
use crate::models::reward::{GrantSource, Reward, RewardGrant, RewardItem};

#[derive(Debug, Default)]
pub struct RewardTables {
    rewards: Table<Reward>,
    grants: Table<RewardGrant>,
}

#[derive(Debug, Default)]
pub struct RewardRepository {
    store: MemoryStore<RewardTables>,
}

impl RewardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        name: String,
        description: String,
        items: Vec<RewardItem>,
        active: bool,
    ) -> Reward {
        let now = Utc::now();
        let mut tables = self.store.write().await;
        tables
            .rewards
            .insert_with(|id| Reward {
                id,
                name,
                description,
                items,
                active,
                created_at: now,
                updated_at: now,
            })
            .clone()
    }

    pub async fn find_by_id(&self, id: i64) -> Option<Reward> {
        self.store.read().await.rewards.get(id).cloned()
    }

    pub async fn exists(&self, id: i64) -> bool {
        self.store.read().await.rewards.contains(id)
    }

    pub async fn list(&self) -> Vec<Reward> {
        self.store.read().await.rewards.values().cloned().collect()
    }

    pub async fn update<F>(&self, id: i64, change: F) -> Result<Reward, StoreError>
    where
        F: FnOnce(&mut Reward),
    {
        let mut tables = self.store.write().await;
        let reward = tables
            .rewards
            .get_mut(id)
            .ok_or(StoreError::NotFound("Reward"))?;
        change(reward);
        reward.updated_at = Utc::now();
        Ok(reward.clone())
    }

    /// Remove a reward definition. Past grants stay in the ledger.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.store
            .write()
            .await
            .rewards
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Reward"))
    }

    pub async fn record_grant(
        &self,
        reward: &Reward,
        user_id: i64,
        source: GrantSource,
    ) -> RewardGrant {
        let now = Utc::now();
        let mut tables = self.store.write().await;
        tables
            .grants
            .insert_with(|id| RewardGrant {
                id,
                reward_id: reward.id,
                user_id,
                source,
                items: reward.items.clone(),
                granted_at: now,
            })
            .clone()
    }

    pub async fn grants_for_user(&self, user_id: i64) -> Vec<RewardGrant> {
        self.store
            .read()
            .await
            .grants
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect()
    }
}
