//! chainwatch-core: data model and chain bookkeeping for the block watcher.
//!
//! # Architecture
//!
//! ```text
//! Watcher → Poller
//!             ├── ChainStateCache  (recent block fingerprints + delivered payloads)
//!             ├── ReorgDetector    (parent-hash continuity, fork point search)
//!             └── PluginRegistry   (block / tx / tx+receipt / receipt-log plugins)
//! ```
//!
//! The RPC side lives in `chainwatch-rpc`, the advancement loop in
//! `chainwatch-evm`.

pub mod cache;
pub mod config;
pub mod error;
pub mod plugin;
pub mod reorg;
pub mod types;

pub use cache::{ChainStateCache, Fingerprinted};
pub use config::{ReceiptLogWatcherConfig, WatcherConfig, DEFAULT_STEP_SIZE_FOR_BIG_LAG};
pub use error::{RpcError, RunError, WatcherError};
pub use plugin::{
    BlockPlugin, Capability, PluginRegistry, ReceiptLogPlugin, TxPlugin, TxReceiptPlugin,
};
pub use reorg::{CanonicalChain, Continuity, ReorgDetector, ReorgEvent};
pub use types::{
    hash_eq, Block, BlockFingerprint, Receipt, ReceiptLog, Removable, RemovableBlock,
    RemovableReceiptLog, RemovableTx, RemovableTxAndReceipt, Transaction, TxAndReceipt,
};
