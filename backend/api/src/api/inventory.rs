//! Inventory ledger handlers.
//!
//! List reads go through the per-address cache; every mutation evicts the
//! affected address before responding.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiState, MessageResponse};
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{normalize_address, InventoryItemRecord, InventoryUpdate, NewInventoryItem};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    pub wallet_address: Option<String>,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub count: usize,
    pub items: Vec<InventoryItemRecord>,
}

/// `GET /inventory?walletAddress=`
pub async fn list(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<InventoryResponse>> {
    let address = query
        .wallet_address
        .filter(|address| !address.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Wallet address is required".to_string()))?;
    let normalized = normalize_address(&address);

    if let Some(items) = state.cache.get(&normalized).await {
        return Ok(Json(InventoryResponse {
            count: items.len(),
            items,
        }));
    }

    let items = db::list_inventory(&state.pool, &normalized).await?;
    state.cache.put(normalized, items.clone()).await;
    Ok(Json(InventoryResponse {
        count: items.len(),
        items,
    }))
}

/// `POST /inventory`
pub async fn create(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItemRecord>)> {
    if body.wallet_address.trim().is_empty()
        || body.name.trim().is_empty()
        || body.description.trim().is_empty()
        || body.category.trim().is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }
    if body.quantity <= 0 {
        return Err(ApiError::Validation(
            "Quantity must be positive".to_string(),
        ));
    }
    if body.price <= 0.0 {
        return Err(ApiError::Validation("Price must be positive".to_string()));
    }

    let item = db::insert_inventory_item(&state.pool, &body).await?;
    state.cache.invalidate(&item.wallet_address).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /inventory`
///
/// Keyed by (walletAddress, name) from the body.
pub async fn update(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<InventoryUpdate>,
) -> Result<Json<InventoryItemRecord>> {
    if body.wallet_address.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "Wallet address and item name are required".to_string(),
        ));
    }

    let item = db::update_inventory_item(&state.pool, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    state.cache.invalidate(&item.wallet_address).await;
    Ok(Json(item))
}

/// `DELETE /inventory?walletAddress=&name=`
pub async fn delete_one(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<MessageResponse>> {
    let (address, name) = match (&query.wallet_address, &query.name) {
        (Some(address), Some(name))
            if !address.trim().is_empty() && !name.trim().is_empty() =>
        {
            (address, name)
        }
        _ => {
            return Err(ApiError::Validation(
                "Wallet address and item name are required".to_string(),
            ))
        }
    };

    let normalized = normalize_address(address);
    if !db::delete_inventory_item(&state.pool, &normalized, name).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }
    state.cache.invalidate(&normalized).await;
    Ok(Json(MessageResponse {
        message: "Item deleted successfully",
    }))
}
