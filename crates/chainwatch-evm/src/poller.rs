//! The advancement loop.
//!
//! One iteration:
//!   1. read the chain head
//!   2. plan a range (catch-up batch or single block)
//!   3. for every block in the range: check continuity against the cache,
//!      on a fork retract the invalidated blocks and rewind, otherwise
//!      dispatch the block and record it
//!
//! Removals for a reorg are emitted highest block first, and inside one
//! block in the reverse of the order the adds went out. Nothing for the new
//! chain is dispatched until every removal has been delivered.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use chainwatch_core::cache::{ChainStateCache, Fingerprinted};
use chainwatch_core::config::WatcherConfig;
use chainwatch_core::error::{RunError, WatcherError};
use chainwatch_core::plugin::{Capability, PluginRegistry};
use chainwatch_core::reorg::{CanonicalChain, ReorgDetector};
use chainwatch_core::types::{Block, BlockFingerprint, ReceiptLog, Removable, TxAndReceipt};
use chainwatch_rpc::{ChainRpc, LogQuery};

use crate::engine::{idle, Advancement, StartPosition};

/// A delivered block together with everything dispatched for it, kept so the
/// same payloads can be retracted after a reorg.
#[derive(Debug, Clone)]
pub struct ProcessedBlock {
    pub fingerprint: BlockFingerprint,
    pub block: Block,
    pub tx_receipts: Vec<TxAndReceipt>,
    pub logs: Vec<ReceiptLog>,
}

impl Fingerprinted for ProcessedBlock {
    fn fingerprint(&self) -> &BlockFingerprint {
        &self.fingerprint
    }
}

/// Canonical-chain lookups for the reorg detector.
struct RpcCanonical<'a>(&'a dyn ChainRpc);

#[async_trait]
impl CanonicalChain for RpcCanonical<'_> {
    async fn canonical_fingerprint(&self, number: u64) -> Result<BlockFingerprint, WatcherError> {
        Ok(self.0.block_fingerprint(number).await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Idle,
    Advanced,
    Rewound,
}

/// Single-run state of a block watcher. Created per run, dropped on exit.
pub struct Poller<'a> {
    rpc: &'a dyn ChainRpc,
    plugins: &'a PluginRegistry,
    config: &'a WatcherConfig,
    advancement: Advancement,
    cache: ChainStateCache<ProcessedBlock>,
    detector: ReorgDetector,
    catching_up: Option<bool>,
}

impl<'a> Poller<'a> {
    pub fn new(
        rpc: &'a dyn ChainRpc,
        plugins: &'a PluginRegistry,
        config: &'a WatcherConfig,
        start: StartPosition,
    ) -> Self {
        Self {
            rpc,
            plugins,
            config,
            advancement: Advancement::new(start, config.step_size_for_big_lag),
            cache: ChainStateCache::new(config.confirmation_window),
            detector: ReorgDetector::new(),
            catching_up: None,
        }
    }

    /// Drive the loop until `cancel` fires or an error ends it.
    ///
    /// Returns the last fully processed height either way.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<Option<u64>, RunError> {
        tracing::info!(
            next = ?self.advancement.next(),
            step = self.config.step_size_for_big_lag,
            window = self.config.confirmation_window,
            "Watcher started"
        );

        loop {
            if cancel.is_cancelled() {
                let last = self.advancement.last_processed();
                tracing::info!(last_processed = ?last, "Watcher cancelled");
                return Ok(last);
            }

            match self.poll_once().await {
                Ok(Progress::Idle) => idle(self.config.poll_interval(), cancel).await,
                Ok(Progress::Advanced | Progress::Rewound) => {}
                Err(source) => {
                    let last = self.advancement.last_processed();
                    tracing::error!(last_processed = ?last, error = %source, "Watcher stopped");
                    return Err(RunError::new(last, source));
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Result<Progress, WatcherError> {
        let highest = self.rpc.current_block_number().await?;
        let Some(range) = self.advancement.plan(highest) else {
            tracing::debug!(highest, "No new block");
            return Ok(Progress::Idle);
        };

        if self.catching_up != Some(range.catch_up) {
            tracing::info!(
                catch_up = range.catch_up,
                lag = highest - range.from + 1,
                "Switching fetch mode"
            );
            self.catching_up = Some(range.catch_up);
        }
        tracing::debug!(from = range.from, to = range.to, highest, "Fetching range");

        for number in range.from..=range.to {
            let block = self.rpc.block_by_number(number).await?;
            let fingerprint = block.fingerprint();

            let canonical = RpcCanonical(self.rpc);
            if let Some(reorg) = self
                .detector
                .check(&self.cache, &fingerprint, &canonical)
                .await?
            {
                self.retract(reorg.resume_from).await?;
                return Ok(Progress::Rewound);
            }

            let processed = self.deliver(block).await?;
            self.cache.record(processed);
            self.advancement.advance_past(number);
        }
        Ok(Progress::Advanced)
    }

    /// Rewind to `resume_from` and retract every cached block at or above it.
    async fn retract(&mut self, resume_from: u64) -> Result<(), WatcherError> {
        self.advancement.rewind_to(resume_from);
        for entry in self.cache.truncate_from(resume_from) {
            tracing::debug!(block = entry.fingerprint.number, "Retracting block");
            self.emit_removals(entry).await?;
        }
        Ok(())
    }

    async fn emit_removals(&self, entry: ProcessedBlock) -> Result<(), WatcherError> {
        let ProcessedBlock {
            block,
            tx_receipts,
            logs,
            ..
        } = entry;

        for log in logs.into_iter().rev() {
            self.plugins
                .dispatch_receipt_log(&Removable::removed(log))
                .await?;
        }
        for pair in tx_receipts.into_iter().rev() {
            self.plugins
                .dispatch_tx_receipt(&Removable::removed(pair))
                .await?;
        }
        if self.plugins.count(Capability::Transaction) > 0 {
            for tx in block.transactions.iter().rev() {
                self.plugins
                    .dispatch_tx(&Removable::removed(tx.clone()))
                    .await?;
            }
        }
        self.plugins.dispatch_block(&Removable::removed(block)).await
    }

    /// Dispatch adds for `block`: the block, its transactions, the wanted
    /// tx+receipt pairs, then matching logs.
    async fn deliver(&self, block: Block) -> Result<ProcessedBlock, WatcherError> {
        let fingerprint = block.fingerprint();
        let added = Removable::added(block);
        self.plugins.dispatch_block(&added).await?;
        let block = added.payload;

        if self.plugins.count(Capability::Transaction) > 0 {
            for tx in &block.transactions {
                self.plugins
                    .dispatch_tx(&Removable::added(tx.clone()))
                    .await?;
            }
        }

        let mut tx_receipts = Vec::new();
        for tx in &block.transactions {
            if !self.plugins.wants_receipt(tx) {
                continue;
            }
            let pair = self.rpc.transaction_and_receipt(&tx.hash).await?;
            let added = Removable::added(pair);
            self.plugins.dispatch_tx_receipt(&added).await?;
            tx_receipts.push(added.payload);
        }

        let logs = self.deliver_logs(block.number).await?;

        Ok(ProcessedBlock {
            fingerprint,
            block,
            tx_receipts,
            logs,
        })
    }

    async fn deliver_logs(&self, number: u64) -> Result<Vec<ReceiptLog>, WatcherError> {
        if self.plugins.count(Capability::ReceiptLog) == 0 {
            return Ok(Vec::new());
        }
        let (addresses, topics) = self.plugins.log_interest();
        let query = LogQuery {
            from_block: number,
            to_block: number,
            addresses,
            topics,
        };

        let plugins = self.plugins;
        let mut logs: Vec<ReceiptLog> = self
            .rpc
            .logs(&query)
            .await?
            .into_iter()
            .filter(|log| plugins.wants_log(log))
            .collect();
        logs.sort_by_key(|log| log.log_index);

        let mut delivered = Vec::with_capacity(logs.len());
        for log in logs {
            let added = Removable::added(log);
            plugins.dispatch_receipt_log(&added).await?;
            delivered.push(added.payload);
        }
        Ok(delivered)
    }
}
