//! Chain-bridge client — anchors orders on the supply-chain contract.
//!
//! The bridge is an external JSON-RPC service wrapping the contract; this
//! client treats it as a black box exposing `createOrder`, `getOrder`,
//! `acceptOrder`, and `completeOrder`. Failures surface as upstream errors
//! and are never retried: a failed call must abort the surrounding workflow
//! before anything is persisted locally.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{ApiError, Result};

pub struct ChainBridge {
    client: Client,
    rpc_url: String,
    contract_address: String,
}

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Receipt returned by mutating contract calls.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Option<String>,
}

/// On-chain view of an order, as reported by `getOrder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOrder {
    pub order_id: String,
    pub status: String,
    pub amount: f64,
    pub metadata_uri: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

impl ChainBridge {
    pub fn new(client: Client, rpc_url: String, contract_address: String) -> Self {
        Self {
            client,
            rpc_url,
            contract_address,
        }
    }

    /// Anchor a new order. The caller aborts its transaction on any error.
    pub async fn create_order(
        &self,
        order_id: &str,
        metadata_uri: &str,
        amount: f64,
    ) -> Result<OrderReceipt> {
        let result = self
            .call(
                "createOrder",
                json!({
                    "contractAddress": self.contract_address,
                    "orderId": order_id,
                    "metadataUri": metadata_uri,
                    "amount": amount,
                }),
            )
            .await?;

        let receipt = parse_receipt(result, "createOrder")?;
        if !receipt.success {
            return Err(ApiError::Upstream(format!(
                "createOrder rejected for {order_id}"
            )));
        }
        debug!(
            "Order {order_id} anchored (tx: {:?})",
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Read back the on-chain record for an order, if the contract has one.
    pub async fn get_order(&self, order_id: &str) -> Result<Option<ChainOrder>> {
        let result = self
            .call(
                "getOrder",
                json!({
                    "contractAddress": self.contract_address,
                    "orderId": order_id,
                }),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }
        let order = serde_json::from_value(result)
            .map_err(|e| ApiError::Upstream(format!("Malformed getOrder response: {e}")))?;
        Ok(Some(order))
    }

    pub async fn accept_order(&self, order_id: &str) -> Result<()> {
        let result = self
            .call(
                "acceptOrder",
                json!({
                    "contractAddress": self.contract_address,
                    "orderId": order_id,
                }),
            )
            .await?;
        expect_success(result, "acceptOrder", order_id)
    }

    pub async fn complete_order(&self, order_id: &str) -> Result<()> {
        let result = self
            .call(
                "completeOrder",
                json!({
                    "contractAddress": self.contract_address,
                    "orderId": order_id,
                }),
            )
            .await?;
        expect_success(result, "completeOrder", order_id)
    }

    /// Issue one JSON-RPC call. A JSON-RPC error object becomes an upstream
    /// error; a missing result is passed through as null for the caller to
    /// interpret.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(ApiError::Upstream(format!(
                "{method} failed with code {}: {}",
                err.code, err.message
            )));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

fn parse_receipt(result: Value, method: &str) -> Result<OrderReceipt> {
    serde_json::from_value(result)
        .map_err(|e| ApiError::Upstream(format!("Malformed {method} response: {e}")))
}

fn expect_success(result: Value, method: &str, order_id: &str) -> Result<()> {
    let receipt = parse_receipt(result, method)?;
    if !receipt.success {
        return Err(ApiError::Upstream(format!(
            "{method} rejected for {order_id}"
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
