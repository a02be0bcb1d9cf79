//! # JSON-RPC Node Client
//!
//! [`NodeClient`] over JSON-RPC 2.0 on HTTP.
//!
//! ## Method Index
//!
//! | Method               | Params                              | Result        |
//! |----------------------|-------------------------------------|---------------|
//! | `oasis_getNextNonce` | `{address, height}`                 | nonce (`u64`) |
//! | `oasis_submitTx`     | `{signed_transaction}`              | ignored       |
//!
//! `height` is either `"latest"` or a block number.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{Height, NodeClient, NodeError};
use crate::staking::Address;
use crate::transaction::SignedTransaction;

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Node methods the gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Parameters: `{address: String, height: "latest" | u64}`
    #[serde(rename = "oasis_getNextNonce")]
    GetNextNonce,
    /// Parameters: `{signed_transaction: SignedTransaction}`
    #[serde(rename = "oasis_submitTx")]
    SubmitTx,
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version. Always "2.0".
    pub jsonrpc: String,
    /// Request identifier. Echoed back in the response.
    pub id: u64,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is set by
/// a conforming node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Unwrap the result as `T`, turning a node-side error into
    /// [`NodeError::Rpc`].
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, NodeError> {
        if let Some(err) = self.error {
            return Err(NodeError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let value = self.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Node client speaking JSON-RPC over HTTP.
#[derive(Debug)]
pub struct JsonRpcNodeClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcNodeClient {
    pub fn new(url: impl Into<String>) -> Result<Self, NodeError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<T, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!(id, ?method, url = %self.url, "node rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NodeError::Transport(format!(
                "HTTP status {}",
                response.status()
            )));
        }
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| NodeError::InvalidResponse(e.to_string()))?;
        body.into_result()
    }
}

#[async_trait]
impl NodeClient for JsonRpcNodeClient {
    async fn get_next_nonce(&self, address: &Address, height: Height) -> Result<u64, NodeError> {
        self.call(
            RpcMethod::GetNextNonce,
            json!({ "address": address, "height": height }),
        )
        .await
    }

    async fn submit_tx(&self, signed: &SignedTransaction) -> Result<(), NodeError> {
        let _: serde_json::Value = self
            .call(RpcMethod::SubmitTx, json!({ "signed_transaction": signed }))
            .await?;
        Ok(())
    }
}
