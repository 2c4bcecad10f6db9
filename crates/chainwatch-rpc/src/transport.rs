//! The `RpcTransport` trait: raw JSON-RPC exchange with a node.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use chainwatch_core::error::RpcError;

use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Sends one JSON-RPC request and returns the node's response.
///
/// Transports do not retry; see [`crate::RetryingRpc`].
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError>;

    /// Endpoint identifier used in log lines.
    fn url(&self) -> &str;
}

/// Monotonic request ids for one client.
#[derive(Debug, Default)]
pub struct RequestIds(AtomicU64);

impl RequestIds {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Call `method` and return its non-null result.
pub async fn call<T: RpcTransport + ?Sized>(
    transport: &T,
    id: u64,
    method: &str,
    params: Vec<Value>,
) -> Result<Value, RpcError> {
    let resp = transport
        .send(JsonRpcRequest::new(id, method, params))
        .await?;
    resp.into_result(method)
}
