//! Identity directory handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{NewParty, PartyRecord, PartyUpdate, Role};

#[derive(Deserialize)]
pub struct PartiesQuery {
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct PartiesResponse {
    pub count: usize,
    pub parties: Vec<PartyRecord>,
}

/// `GET /parties`
pub async fn list(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PartiesQuery>,
) -> Result<Json<PartiesResponse>> {
    let parties = db::list_parties(&state.pool, query.role.as_deref()).await?;
    Ok(Json(PartiesResponse {
        count: parties.len(),
        parties,
    }))
}

/// `POST /parties`
///
/// Registers a new party. Conflicts when the normalized wallet address is
/// already taken; the verification flag always starts false.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(mut body): Json<NewParty>,
) -> Result<(StatusCode, Json<PartyRecord>)> {
    if body.wallet_address.trim().is_empty()
        || body.role.trim().is_empty()
        || body.name.trim().is_empty()
        || body.company_name.trim().is_empty()
        || body.email.trim().is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }
    let role = Role::parse(&body.role)
        .ok_or_else(|| ApiError::Validation(format!("Unknown role: {}", body.role)))?;
    body.role = role.as_str().to_string();

    let party = db::insert_party(&state.pool, &body).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

/// `GET /parties/:address`
pub async fn get_one(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<PartyRecord>> {
    let party = db::get_party(&state.pool, &address)
        .await?
        .ok_or_else(|| ApiError::NotFound("Party not found".to_string()))?;
    Ok(Json(party))
}

/// `PUT /parties/:address`
///
/// Profile update. Address, role, and verification flag cannot be changed
/// here regardless of the payload.
pub async fn update(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
    Json(body): Json<PartyUpdate>,
) -> Result<Json<PartyRecord>> {
    if body.is_empty() {
        return Err(ApiError::Validation("No data provided".to_string()));
    }
    let party = db::update_party(&state.pool, &address, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Party not found".to_string()))?;
    Ok(Json(party))
}
