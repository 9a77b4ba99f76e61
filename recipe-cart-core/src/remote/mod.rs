//! Remote shopping list service.
//!
//! The engine talks to the backend only through [`ShoppingListService`]:
//!
//! - `GET /shopping-list/me` returns every record of the current user
//! - `PATCH /shopping-items` upserts a single line item
//! - `DELETE /shopping-list/{id}` removes a record and all its items
//!
//! [`HttpShoppingListService`] is the reqwest implementation.

mod client;
mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{IngredientId, RecordId, ShoppingListRecord};

pub use client::{HttpShoppingListService, DEFAULT_TIMEOUT};
pub use error::ApiError;

/// Backend operations the shopping list engine depends on.
#[async_trait]
pub trait ShoppingListService: Send + Sync {
    /// Fetch every shopping list record of the current user. All or nothing.
    async fn fetch_records(&self) -> Result<Vec<ShoppingListRecord>, ApiError>;

    /// Upsert one line item. The endpoint replaces the whole item, so
    /// quantity and unit must always be sent.
    async fn update_item(&self, update: &LineItemUpdate) -> Result<(), ApiError>;

    /// Delete a record. Deleting an id that is already gone succeeds.
    async fn delete_record(&self, id: RecordId) -> Result<(), ApiError>;
}

/// Full line item payload for the upsert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemUpdate {
    #[serde(rename = "shoppingList", with = "id_object")]
    pub record_id: RecordId,
    #[serde(rename = "ingredient", with = "id_object")]
    pub ingredient_id: IngredientId,
    pub quantity: f64,
    pub unit: Option<String>,
    pub purchased: bool,
}

/// Encodes an id as `{ "id": <id> }`, the shape the backend expects for references.
mod id_object {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct IdObject<T> {
        id: T,
    }

    pub fn serialize<T: Serialize + Copy, S: Serializer>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        IdObject { id: *value }.serialize(serializer)
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        IdObject::<T>::deserialize(deserializer).map(|o| o.id)
    }
}
