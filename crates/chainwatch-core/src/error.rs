//! Error types for the watcher pipeline.

use thiserror::Error;

/// Errors raised by a chain RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    /// Request timed out after the configured duration.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The call succeeded but returned no usable payload (JSON `null`).
    #[error("{method} returned an empty result")]
    EmptyResult { method: String },

    /// The response could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl RpcError {
    /// Returns `true` if the error is transient and the call may be retried.
    ///
    /// Decode failures and JSON-RPC protocol errors (invalid request, unknown
    /// method, invalid params) will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Node { code, .. } => !matches!(*code, -32602..=-32600),
            Self::Http(_) | Self::Timeout { .. } | Self::EmptyResult { .. } => true,
        }
    }

    /// Shorthand for an empty-result error on `method`.
    pub fn empty(method: impl Into<String>) -> Self {
        Self::EmptyResult {
            method: method.into(),
        }
    }
}

/// Errors that stop a watcher or reject its configuration.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Invalid configuration, rejected at construction or registration time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A plugin callback failed. Not caught by the dispatcher.
    #[error("plugin '{plugin}' failed: {reason}")]
    Plugin { plugin: String, reason: String },
}

impl WatcherError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn plugin(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the watcher stopped because the RPC endpoint failed.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Terminal error of a watcher run.
///
/// Carries the last fully processed block so the caller can resume from
/// `last_processed + 1`.
#[derive(Debug, Error)]
#[error("watcher stopped (last processed block: {last_processed:?}): {source}")]
pub struct RunError {
    pub last_processed: Option<u64>,
    #[source]
    pub source: WatcherError,
}

impl RunError {
    pub fn new(last_processed: Option<u64>, source: impl Into<WatcherError>) -> Self {
        Self {
            last_processed,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(RpcError::Http("connection reset".into()).is_retryable());
        assert!(RpcError::Timeout { ms: 30_000 }.is_retryable());
        assert!(RpcError::empty("eth_getBlockByNumber").is_retryable());
        assert!(RpcError::Node {
            code: -32000,
            message: "header not found".into()
        }
        .is_retryable());
    }

    #[test]
    fn protocol_errors_are_not_retryable() {
        assert!(!RpcError::Decode("missing field `hash`".into()).is_retryable());
        for code in [-32600, -32601, -32602] {
            let err = RpcError::Node {
                code,
                message: "bad request".into(),
            };
            assert!(!err.is_retryable(), "code {code} should not be retried");
        }
    }

    #[test]
    fn run_error_reports_progress() {
        let err = RunError::new(Some(41), RpcError::Http("down".into()));
        assert_eq!(err.last_processed, Some(41));
        assert!(err.source.is_rpc());
        assert!(err.to_string().contains("Some(41)"));
    }
}
