//! Range-oriented watcher for one contract's event logs.
//!
//! Unlike [`crate::Watcher`] it never fetches blocks: each iteration issues a
//! single `eth_getLogs` over the planned range and hands the matching logs to
//! the handler in one call. Logs the node marks as `removed` are passed
//! through unchanged.

use async_trait::async_trait;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use chainwatch_core::config::ReceiptLogWatcherConfig;
use chainwatch_core::error::{RunError, WatcherError};
use chainwatch_core::plugin::log_matches;
use chainwatch_core::types::ReceiptLog;
use chainwatch_rpc::{ChainRpc, EthRpcClient, HttpTransport, LogQuery, RetryConfig, RetryingRpc};

use crate::engine::{idle, Advancement, StartPosition};

/// Receives the logs of each processed range.
#[async_trait]
pub trait ReceiptLogHandler: Send + Sync {
    /// `is_up_to_highest_block` is `true` when `to` is the head observed in
    /// this iteration.
    async fn handle(
        &self,
        from: u64,
        to: u64,
        logs: &[ReceiptLog],
        is_up_to_highest_block: bool,
    ) -> Result<(), WatcherError>;
}

/// A [`ReceiptLogHandler`] backed by a closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

/// Wrap a synchronous closure as a [`ReceiptLogHandler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(u64, u64, &[ReceiptLog], bool) -> Result<(), WatcherError> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> ReceiptLogHandler for FnHandler<F>
where
    F: Fn(u64, u64, &[ReceiptLog], bool) -> Result<(), WatcherError> + Send + Sync,
{
    async fn handle(
        &self,
        from: u64,
        to: u64,
        logs: &[ReceiptLog],
        is_up_to_highest_block: bool,
    ) -> Result<(), WatcherError> {
        (self.0)(from, to, logs, is_up_to_highest_block)
    }
}

pub struct ReceiptLogWatcher {
    rpc: RetryingRpc<Arc<dyn ChainRpc>>,
    contract: String,
    topics: Vec<String>,
    start: StartPosition,
    config: ReceiptLogWatcherConfig,
    handler: Box<dyn ReceiptLogHandler>,
}

impl ReceiptLogWatcher {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        contract: impl Into<String>,
        topics: Vec<String>,
        start: StartPosition,
        config: ReceiptLogWatcherConfig,
        handler: impl ReceiptLogHandler + 'static,
    ) -> Result<Self, WatcherError> {
        config.validate()?;
        let contract = contract.into();
        if contract.trim().is_empty() {
            return Err(WatcherError::config(
                "receipt-log watcher requires a contract address",
            ));
        }
        if topics.is_empty() {
            return Err(WatcherError::config(
                "receipt-log watcher requires at least one topic",
            ));
        }
        let retry = RetryConfig {
            max_retries: config.max_rpc_retries,
            ..RetryConfig::default()
        };
        Ok(Self {
            rpc: RetryingRpc::new(rpc, retry),
            contract,
            topics,
            start,
            config,
            handler: Box::new(handler),
        })
    }

    pub fn http(
        url: impl Into<String>,
        contract: impl Into<String>,
        topics: Vec<String>,
        start: StartPosition,
        config: ReceiptLogWatcherConfig,
        handler: impl ReceiptLogHandler + 'static,
    ) -> Result<Self, WatcherError> {
        let transport = HttpTransport::default_for(url)?;
        Self::new(
            Arc::new(EthRpcClient::new(transport)),
            contract,
            topics,
            start,
            config,
            handler,
        )
    }

    /// Run until `cancel` fires or an error ends the loop. Returns the last
    /// fully processed height either way.
    pub async fn run(&self, cancel: CancellationToken) -> Result<Option<u64>, RunError> {
        let mut advancement = Advancement::new(self.start, self.config.step_size_for_big_lag);
        tracing::info!(
            contract = %self.contract,
            topics = self.topics.len(),
            next = ?advancement.next(),
            "Receipt-log watcher started"
        );

        loop {
            if cancel.is_cancelled() {
                let last = advancement.last_processed();
                tracing::info!(last_processed = ?last, "Receipt-log watcher cancelled");
                return Ok(last);
            }

            match self.poll_once(&mut advancement).await {
                Ok(true) => {}
                Ok(false) => idle(self.config.poll_interval(), &cancel).await,
                Err(source) => {
                    let last = advancement.last_processed();
                    tracing::error!(last_processed = ?last, error = %source, "Receipt-log watcher stopped");
                    return Err(RunError::new(last, source));
                }
            }
        }
    }

    /// Returns `false` when there was nothing new to fetch.
    async fn poll_once(&self, advancement: &mut Advancement) -> Result<bool, WatcherError> {
        let highest = self.rpc.current_block_number().await?;
        let Some(range) = advancement.plan(highest) else {
            tracing::debug!(highest, "No new block");
            return Ok(false);
        };

        let query = LogQuery::new(range.from, range.to)
            .address(self.contract.as_str())
            .topics(self.topics.iter().cloned());
        let mut logs: Vec<ReceiptLog> = self
            .rpc
            .logs(&query)
            .await?
            .into_iter()
            .filter(|log| log_matches(&self.contract, &self.topics, log))
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        tracing::debug!(from = range.from, to = range.to, logs = logs.len(), "Fetched logs");

        if !logs.is_empty() || self.config.emit_empty_ranges {
            self.handler
                .handle(range.from, range.to, &logs, range.to == highest)
                .await?;
        }
        advancement.advance_past(range.to);
        Ok(true)
    }
}
