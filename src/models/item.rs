// Item catalogue and per-user holdings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price in minor currency units
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity of one item held by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserItem {
    pub item_id: i64,
    pub name: String,
    pub quantity: u32,
}

/// Catalogue entry as returned to a caller; `ownedQuantity` only when authenticated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_quantity: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let request = CreateItemRequest {
            name: "Sword".to_string(),
            description: String::new(),
            price: -1,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_owned_quantity_only_when_present() {
        let now = Utc::now();
        let item = Item {
            id: 1,
            name: "Sword".to_string(),
            description: String::new(),
            price: 100,
            created_at: now,
            updated_at: now,
        };

        let anonymous = serde_json::to_value(ItemResponse {
            item: item.clone(),
            owned_quantity: None,
        })
        .expect("serialize");
        assert!(anonymous.get("ownedQuantity").is_none());
        assert_eq!(anonymous["name"], "Sword");

        let owned = serde_json::to_value(ItemResponse {
            item,
            owned_quantity: Some(2),
        })
        .expect("serialize");
        assert_eq!(owned["ownedQuantity"], 2);
    }
}
