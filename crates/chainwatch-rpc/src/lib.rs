//! chainwatch-rpc: node access for the watcher.
//!
//! ```text
//! RetryingRpc<EthRpcClient<HttpTransport>>
//!     │           │             └── one JSON-RPC POST per call
//!     │           └── eth_* methods, hex decoding, null → EmptyResult
//!     └── linear backoff, retryable errors only
//! ```

pub mod client;
pub mod http;
pub mod request;
pub mod retry;
pub mod retrying;
pub mod transport;
pub mod wire;

pub use client::{ChainRpc, EthRpcClient, LogQuery};
pub use http::HttpTransport;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use retrying::RetryingRpc;
pub use transport::RpcTransport;
