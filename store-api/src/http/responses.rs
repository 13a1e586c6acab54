use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{ItemModel, StoreModel};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResponse {
    pub name: String,
    pub price: f64,
}

impl From<ItemModel> for ItemResponse {
    fn from(item: ItemModel) -> Self {
        Self {
            name: item.name,
            price: item.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub name: String,
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<StoreResponse>,
}

/// Render a store together with its current items.
pub fn build_store_response(db: &Database, store: StoreModel) -> Result<StoreResponse, DbError> {
    let items = store
        .items(db)?
        .into_iter()
        .map(ItemResponse::from)
        .collect();
    Ok(StoreResponse {
        name: store.name,
        items,
    })
}
