//! Catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiState, MessageResponse};
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{NewProduct, ProductRecord, ProductUpdate};

#[derive(Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct ProductsResponse {
    pub count: usize,
    pub products: Vec<ProductRecord>,
}

/// `GET /products`
pub async fn list(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsResponse>> {
    let products =
        db::list_products(&state.pool, query.category.as_deref(), query.status.as_deref())
            .await?;
    Ok(Json(ProductsResponse {
        count: products.len(),
        products,
    }))
}

/// `POST /products`
///
/// Creates a catalog entry. The identifier is generated server-side and the
/// status derived from the quantity; neither is accepted from the client.
pub async fn create(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductRecord>)> {
    if body.name.trim().is_empty()
        || body.category.trim().is_empty()
        || body.description.trim().is_empty()
        || body.manufacturer.trim().is_empty()
        || body.unit.trim().is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }
    if body.quantity < 0 {
        return Err(ApiError::Validation(
            "Quantity must not be negative".to_string(),
        ));
    }
    if body.price < 0.0 {
        return Err(ApiError::Validation(
            "Price must not be negative".to_string(),
        ));
    }

    let product = db::insert_product(&state.pool, &body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/:id`
pub async fn get_one(
    State(state): State<Arc<ApiState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductRecord>> {
    let product = db::get_product(&state.pool, &product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

/// `PUT /products/:id`
pub async fn update(
    State(state): State<Arc<ApiState>>,
    Path(product_id): Path<String>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<ProductRecord>> {
    if matches!(body.quantity, Some(quantity) if quantity < 0) {
        return Err(ApiError::Validation(
            "Quantity must not be negative".to_string(),
        ));
    }
    if matches!(body.price, Some(price) if price < 0.0) {
        return Err(ApiError::Validation(
            "Price must not be negative".to_string(),
        ));
    }

    let product = db::update_product(&state.pool, &product_id, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

/// `DELETE /products/:id`
pub async fn delete_one(
    State(state): State<Arc<ApiState>>,
    Path(product_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !db::delete_product(&state.pool, &product_id).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
