//! Plugin traits + registry.
//!
//! A plugin subscribes to one capability: blocks, transactions,
//! transaction+receipt pairs, or contract event logs. Each trait exposes an
//! interest query (`wants`) and `accept`. The registry keeps registrations
//! in order and dispatches every event to the interested plugins one after
//! another; the first callback error aborts the dispatch and is returned.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::WatcherError;
use crate::types::{
    Block, ReceiptLog, RemovableBlock, RemovableReceiptLog, RemovableTx, RemovableTxAndReceipt,
    Transaction,
};

pub mod block;
pub mod receipt_log;
pub mod tx;
pub mod tx_receipt;

pub use block::{BlockNumPlugin, SimpleBlockPlugin};
pub use receipt_log::{log_matches, SimpleReceiptLogPlugin};
pub use tx::{SimpleTxPlugin, TxHashPlugin};
pub use tx_receipt::{Erc20Transfer, Erc20TransferPlugin, SimpleTxReceiptPlugin, TRANSFER_TOPIC};

/// The four plugin capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Block,
    Transaction,
    TransactionAndReceipt,
    ReceiptLog,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Transaction => write!(f, "transaction"),
            Self::TransactionAndReceipt => write!(f, "transaction+receipt"),
            Self::ReceiptLog => write!(f, "receipt-log"),
        }
    }
}

/// Receives every block (added or removed) it is interested in.
#[async_trait]
pub trait BlockPlugin: Send + Sync {
    fn wants(&self, _block: &Block) -> bool {
        true
    }

    async fn accept(&self, block: &RemovableBlock) -> Result<(), WatcherError>;
}

/// Receives the transactions of every processed block.
#[async_trait]
pub trait TxPlugin: Send + Sync {
    fn wants(&self, _tx: &Transaction) -> bool {
        true
    }

    async fn accept(&self, tx: &RemovableTx) -> Result<(), WatcherError>;
}

/// Receives transactions paired with their receipts.
///
/// `wants` is evaluated on the transaction alone, before the receipt is
/// fetched, so uninteresting transactions cost no extra RPC call.
#[async_trait]
pub trait TxReceiptPlugin: Send + Sync {
    fn wants(&self, _tx: &Transaction) -> bool {
        true
    }

    async fn accept(&self, tx_and_receipt: &RemovableTxAndReceipt) -> Result<(), WatcherError>;
}

/// Receives event logs from one contract with one of a set of first topics.
#[async_trait]
pub trait ReceiptLogPlugin: Send + Sync {
    fn from_contract(&self) -> &str;

    fn interested_topics(&self) -> &[String];

    fn wants(&self, log: &ReceiptLog) -> bool {
        log_matches(self.from_contract(), self.interested_topics(), log)
    }

    async fn accept(&self, log: &RemovableReceiptLog) -> Result<(), WatcherError>;
}

/// Append-only registry of plugins, one list per capability.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    block_plugins: Vec<Arc<dyn BlockPlugin>>,
    tx_plugins: Vec<Arc<dyn TxPlugin>>,
    tx_receipt_plugins: Vec<Arc<dyn TxReceiptPlugin>>,
    receipt_log_plugins: Vec<Arc<dyn ReceiptLogPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_block_plugin(&mut self, plugin: Arc<dyn BlockPlugin>) {
        self.block_plugins.push(plugin);
        self.registered(Capability::Block);
    }

    pub fn register_tx_plugin(&mut self, plugin: Arc<dyn TxPlugin>) {
        self.tx_plugins.push(plugin);
        self.registered(Capability::Transaction);
    }

    pub fn register_tx_receipt_plugin(&mut self, plugin: Arc<dyn TxReceiptPlugin>) {
        self.tx_receipt_plugins.push(plugin);
        self.registered(Capability::TransactionAndReceipt);
    }

    /// Register a receipt-log plugin.
    ///
    /// Rejects a plugin without a contract address or without topics: it
    /// could never match anything.
    pub fn register_receipt_log_plugin(
        &mut self,
        plugin: Arc<dyn ReceiptLogPlugin>,
    ) -> Result<(), WatcherError> {
        let capability = Capability::ReceiptLog;
        if plugin.from_contract().trim().is_empty() {
            return Err(WatcherError::config(format!(
                "{capability} plugin requires a contract address"
            )));
        }
        if plugin.interested_topics().is_empty() {
            return Err(WatcherError::config(format!(
                "{capability} plugin requires at least one topic"
            )));
        }
        self.receipt_log_plugins.push(plugin);
        self.registered(capability);
        Ok(())
    }

    fn registered(&self, capability: Capability) {
        tracing::debug!(%capability, total = self.count(capability), "Plugin registered");
    }

    /// Number of registrations for `capability`.
    pub fn count(&self, capability: Capability) -> usize {
        match capability {
            Capability::Block => self.block_plugins.len(),
            Capability::Transaction => self.tx_plugins.len(),
            Capability::TransactionAndReceipt => self.tx_receipt_plugins.len(),
            Capability::ReceiptLog => self.receipt_log_plugins.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.block_plugins.is_empty()
            && self.tx_plugins.is_empty()
            && self.tx_receipt_plugins.is_empty()
            && self.receipt_log_plugins.is_empty()
    }

    /// Returns `true` if some tx+receipt plugin wants `tx`, i.e. its receipt
    /// has to be fetched.
    pub fn wants_receipt(&self, tx: &Transaction) -> bool {
        self.tx_receipt_plugins.iter().any(|p| p.wants(tx))
    }

    /// Returns `true` if some receipt-log plugin wants `log`.
    pub fn wants_log(&self, log: &ReceiptLog) -> bool {
        self.receipt_log_plugins.iter().any(|p| p.wants(log))
    }

    /// Contract addresses and first topics of every receipt-log plugin,
    /// deduplicated case-insensitively, in registration order.
    pub fn log_interest(&self) -> (Vec<String>, Vec<String>) {
        let mut addresses: Vec<String> = Vec::new();
        let mut topics: Vec<String> = Vec::new();
        for plugin in &self.receipt_log_plugins {
            push_unique(&mut addresses, plugin.from_contract());
            for topic in plugin.interested_topics() {
                push_unique(&mut topics, topic);
            }
        }
        (addresses, topics)
    }

    pub async fn dispatch_block(&self, block: &RemovableBlock) -> Result<(), WatcherError> {
        for plugin in &self.block_plugins {
            if plugin.wants(&block.payload) {
                plugin.accept(block).await?;
            }
        }
        Ok(())
    }

    pub async fn dispatch_tx(&self, tx: &RemovableTx) -> Result<(), WatcherError> {
        for plugin in &self.tx_plugins {
            if plugin.wants(&tx.payload) {
                plugin.accept(tx).await?;
            }
        }
        Ok(())
    }

    pub async fn dispatch_tx_receipt(
        &self,
        tx_and_receipt: &RemovableTxAndReceipt,
    ) -> Result<(), WatcherError> {
        for plugin in &self.tx_receipt_plugins {
            if plugin.wants(&tx_and_receipt.payload.tx) {
                plugin.accept(tx_and_receipt).await?;
            }
        }
        Ok(())
    }

    pub async fn dispatch_receipt_log(&self, log: &RemovableReceiptLog) -> Result<(), WatcherError> {
        for plugin in &self.receipt_log_plugins {
            if plugin.wants(&log.payload) {
                plugin.accept(log).await?;
            }
        }
        Ok(())
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        values.push(value.to_string());
    }
}
