//! HTTP JSON-RPC transport backed by `reqwest`.

use async_trait::async_trait;
use std::time::Duration;

use chainwatch_core::error::RpcError;

use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

/// Per-request timeout applied when none is given.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Single-endpoint HTTP transport. One POST per request, no retry.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
            request_timeout,
        })
    }

    pub fn default_for(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::new(url, DEFAULT_REQUEST_TIMEOUT)
    }

    fn map_err(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else {
            RpcError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        tracing::trace!(method = %req.method, url = %self.url, "rpc request");
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| self.map_err(e))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
