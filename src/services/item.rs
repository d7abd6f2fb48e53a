// Item catalogue and user holdings

use std::sync::Arc;
use tracing::info;

use crate::db::ItemRepository;
use crate::models::item::{CreateItemRequest, Item, ItemResponse, UpdateItemRequest, UserItem};
use crate::models::reward::RewardItem;
use crate::utils::{trim_and_validate_field, ServiceError};

pub struct ItemService {
    items: Arc<ItemRepository>,
}

impl ItemService {
    pub fn new(items: Arc<ItemRepository>) -> Self {
        Self { items }
    }

    pub async fn create(&self, request: &CreateItemRequest) -> Result<Item, ServiceError> {
        let name =
            trim_and_validate_field(&request.name, "Name", true).map_err(ServiceError::ValidationError)?;
        if request.price < 0 {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let item = self
            .items
            .insert(name, request.description.trim().to_string(), request.price)
            .await;
        info!(item_id = item.id, "Item created");
        Ok(item)
    }

    pub async fn get(&self, id: i64) -> Result<Item, ServiceError> {
        self.items
            .find_by_id(id)
            .await
            .ok_or(ServiceError::NotFound("Item"))
    }

    pub async fn list(&self) -> Vec<Item> {
        self.items.list().await
    }

    /// Catalogue entry with the caller's owned quantity when a user is known
    pub async fn get_for(&self, id: i64, user_id: Option<i64>) -> Result<ItemResponse, ServiceError> {
        let item = self.get(id).await?;
        let owned_quantity = match user_id {
            Some(user_id) => Some(self.items.owned_quantity(user_id, id).await),
            None => None,
        };
        Ok(ItemResponse {
            item,
            owned_quantity,
        })
    }

    pub async fn list_for(&self, user_id: Option<i64>) -> Vec<ItemResponse> {
        match user_id {
            Some(user_id) => self
                .items
                .list_with_owned(user_id)
                .await
                .into_iter()
                .map(|(item, owned)| ItemResponse {
                    item,
                    owned_quantity: Some(owned),
                })
                .collect(),
            None => self
                .items
                .list()
                .await
                .into_iter()
                .map(|item| ItemResponse {
                    item,
                    owned_quantity: None,
                })
                .collect(),
        }
    }

    pub async fn update(&self, id: i64, request: &UpdateItemRequest) -> Result<Item, ServiceError> {
        let name = match &request.name {
            Some(name) => Some(
                trim_and_validate_field(name, "Name", true).map_err(ServiceError::ValidationError)?,
            ),
            None => None,
        };
        if request.price.is_some_and(|p| p < 0) {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let item = self
            .items
            .update(id, |item| {
                if let Some(name) = name {
                    item.name = name;
                }
                if let Some(description) = &request.description {
                    item.description = description.trim().to_string();
                }
                if let Some(price) = request.price {
                    item.price = price;
                }
            })
            .await?;
        Ok(item)
    }

    /// Delete an item; every user's holding of it goes too
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.items.delete(id).await?;
        info!(item_id = id, "Item deleted");
        Ok(())
    }

    pub async fn user_items(&self, user_id: i64) -> Vec<UserItem> {
        self.items.holdings_for_user(user_id).await
    }

    /// Add a bundle of items to a user's holdings, all or nothing
    pub async fn grant_items(&self, user_id: i64, lines: &[RewardItem]) -> Result<(), ServiceError> {
        self.items.grant(user_id, lines).await?;
        Ok(())
    }

    pub async fn clear_holdings(&self, user_id: i64) {
        self.items.clear_holdings(user_id).await;
    }

    /// Ids from `ids` that are not in the catalogue
    pub async fn missing_items(&self, ids: &[i64]) -> Vec<i64> {
        self.items.missing(ids).await
    }
}
