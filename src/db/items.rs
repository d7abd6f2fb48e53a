// Item catalogue and user holdings, kept behind one lock so a grant is atomic

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

use super::memory_store::{MemoryStore, StoreError, Table};
use crate::models::item::{Item, UserItem};
use crate::models::reward::RewardItem;

#[derive(Debug, Default)]
pub struct ItemTables {
    items: Table<Item>,
    /// user id -> item id -> quantity
    holdings: HashMap<i64, BTreeMap<i64, u32>>,
}

#[derive(Debug, Default)]
pub struct ItemRepository {
    store: MemoryStore<ItemTables>,
}

impl ItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, name: String, description: String, price: i64) -> Item {
        let now = Utc::now();
        let mut tables = self.store.write().await;
        tables
            .items
            .insert_with(|id| Item {
                id,
                name,
                description,
                price,
                created_at: now,
                updated_at: now,
            })
            .clone()
    }

    pub async fn find_by_id(&self, id: i64) -> Option<Item> {
        self.store.read().await.items.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Item> {
        self.store.read().await.items.values().cloned().collect()
    }

    /// Catalogue paired with one user's owned quantity, read under a single guard
    pub async fn list_with_owned(&self, user_id: i64) -> Vec<(Item, u32)> {
        let tables = self.store.read().await;
        let held = tables.holdings.get(&user_id);
        tables
            .items
            .values()
            .map(|item| {
                let owned = held.and_then(|h| h.get(&item.id)).copied().unwrap_or(0);
                (item.clone(), owned)
            })
            .collect()
    }

    /// Ids from `ids` that are not in the catalogue
    pub async fn missing(&self, ids: &[i64]) -> Vec<i64> {
        let tables = self.store.read().await;
        ids.iter()
            .copied()
            .filter(|id| !tables.items.contains(*id))
            .collect()
    }

    pub async fn update<F>(&self, id: i64, change: F) -> Result<Item, StoreError>
    where
        F: FnOnce(&mut Item),
    {
        let mut tables = self.store.write().await;
        let item = tables.items.get_mut(id).ok_or(StoreError::NotFound("Item"))?;
        change(item);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    /// Remove an item and every user's holding of it
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.store.write().await;
        tables
            .items
            .remove(id)
            .ok_or(StoreError::NotFound("Item"))?;
        for held in tables.holdings.values_mut() {
            held.remove(&id);
        }
        Ok(())
    }

    pub async fn owned_quantity(&self, user_id: i64, item_id: i64) -> u32 {
        self.store
            .read()
            .await
            .holdings
            .get(&user_id)
            .and_then(|held| held.get(&item_id))
            .copied()
            .unwrap_or(0)
    }

    pub async fn holdings_for_user(&self, user_id: i64) -> Vec<UserItem> {
        let tables = self.store.read().await;
        let Some(held) = tables.holdings.get(&user_id) else {
            return Vec::new();
        };

        held.iter()
            .filter_map(|(item_id, quantity)| {
                tables.items.get(*item_id).map(|item| UserItem {
                    item_id: *item_id,
                    name: item.name.clone(),
                    quantity: *quantity,
                })
            })
            .collect()
    }

    /// Add every line of `lines` to the user's holdings, or none of them.
    ///
    /// All lines are checked (item exists, quantity at least 1, no overflow)
    /// before anything is written, and the whole grant happens under one
    /// write lock.
    pub async fn grant(&self, user_id: i64, lines: &[RewardItem]) -> Result<(), StoreError> {
        if lines.is_empty() {
            return Err(StoreError::Invalid("grant has no items".to_string()));
        }

        let mut tables = self.store.write().await;

        // Merge duplicate lines so the overflow check sees the real total
        let mut totals: BTreeMap<i64, u32> = BTreeMap::new();
        for line in lines {
            if line.quantity == 0 {
                return Err(StoreError::Invalid(format!(
                    "quantity for item {} must be at least 1",
                    line.item_id
                )));
            }
            if !tables.items.contains(line.item_id) {
                return Err(StoreError::NotFound("Item"));
            }
            let total = totals.entry(line.item_id).or_insert(0);
            *total = total.checked_add(line.quantity).ok_or_else(|| {
                StoreError::Invalid(format!("quantity overflow for item {}", line.item_id))
            })?;
        }

        let current = tables.holdings.get(&user_id);
        for (item_id, add) in &totals {
            let held = current.and_then(|h| h.get(item_id)).copied().unwrap_or(0);
            if held.checked_add(*add).is_none() {
                return Err(StoreError::Invalid(format!(
                    "quantity overflow for item {}",
                    item_id
                )));
            }
        }

        let held = tables.holdings.entry(user_id).or_default();
        for (item_id, add) in totals {
            *held.entry(item_id).or_insert(0) += add;
        }
        Ok(())
    }

    /// Drop every holding of a user (used when the user is deleted)
    pub async fn clear_holdings(&self, user_id: i64) {
        self.store.write().await.holdings.remove(&user_id);
    }
}
