//! Axum REST API handlers.

pub mod inventory;
pub mod orders;
pub mod parties;
pub mod products;

use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::cache::InventoryCache;
use crate::chain::ChainBridge;

/// Shared state handed to every handler.
pub struct ApiState {
    pub pool: SqlitePool,
    pub cache: InventoryCache,
    pub bridge: Option<ChainBridge>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
