//! Order workflow handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::chain::ChainOrder;
use crate::errors::{ApiError, Result};
use crate::models::{ChainLinkage, NewOrder, OrderDetail, OrderRecord, OrderUpdate};
use crate::orders::{self, OrderFilter};

#[derive(Deserialize)]
pub struct OrdersQuery {
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub count: usize,
    pub orders: Vec<OrderDetail>,
}

/// Local order joined with whatever the contract reports for it.
#[derive(Serialize)]
pub struct ChainViewResponse {
    pub order: OrderDetail,
    pub chain: Option<ChainOrder>,
}

/// `GET /orders?buyer=&seller=&status=`
pub async fn list(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>> {
    let filter = OrderFilter {
        buyer: query.buyer,
        seller: query.seller,
        status: query.status,
    };
    let orders = orders::list_orders(&state.pool, &filter).await?;
    Ok(Json(OrdersResponse {
        count: orders.len(),
        orders,
    }))
}

/// `POST /orders`
pub async fn create(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    if body.buyer_address.trim().is_empty() || body.seller_address.trim().is_empty() {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }
    let detail = orders::create_order(&state.pool, state.bridge.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /orders/:id`
pub async fn get_one(
    State(state): State<Arc<ApiState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let detail = orders::get_order_detail(&state.pool, &order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(detail))
}

/// `PUT /orders/:id`
pub async fn update(
    State(state): State<Arc<ApiState>>,
    Path(order_id): Path<String>,
    Json(body): Json<OrderUpdate>,
) -> Result<Json<OrderDetail>> {
    let detail = orders::update_order(&state.pool, state.bridge.as_ref(), &order_id, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(detail))
}

/// `PATCH /orders/:id`
///
/// Chain-linkage update only.
pub async fn patch_chain(
    State(state): State<Arc<ApiState>>,
    Path(order_id): Path<String>,
    Json(body): Json<ChainLinkage>,
) -> Result<Json<OrderRecord>> {
    let order = orders::set_chain_linkage(&state.pool, &order_id, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

/// `GET /orders/:id/chain`
///
/// Read-time reconciliation of the local record with the on-chain one.
pub async fn chain_view(
    State(state): State<Arc<ApiState>>,
    Path(order_id): Path<String>,
) -> Result<Json<ChainViewResponse>> {
    let bridge = state
        .bridge
        .as_ref()
        .ok_or_else(|| ApiError::Validation("Chain bridge is not configured".to_string()))?;
    let order = orders::get_order_detail(&state.pool, &order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    let chain = bridge.get_order(&order.order.order_id).await?;
    Ok(Json(ChainViewResponse { order, chain }))
}
