//! The block watcher: plugins + retrying RPC + the advancement loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use chainwatch_core::config::WatcherConfig;
use chainwatch_core::error::{RunError, WatcherError};
use chainwatch_core::plugin::{
    BlockPlugin, PluginRegistry, ReceiptLogPlugin, TxPlugin, TxReceiptPlugin,
};
use chainwatch_rpc::{ChainRpc, EthRpcClient, HttpTransport, RetryConfig, RetryingRpc};

use crate::engine::StartPosition;
use crate::poller::Poller;

/// Watches the canonical chain and feeds registered plugins.
///
/// Register plugins first, then call one of the `run_*` methods. Each run
/// starts from an empty chain state cache.
///
/// ```rust,no_run
/// use chainwatch_core::plugin::BlockNumPlugin;
/// use chainwatch_core::WatcherConfig;
/// use chainwatch_evm::Watcher;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let mut watcher = Watcher::http("http://localhost:8545", WatcherConfig::default())?;
/// watcher.register_block_plugin(BlockNumPlugin::new(|number, removed| {
///     println!("block {number} removed={removed}");
/// }));
/// let last = watcher.run_until_cancelled(CancellationToken::new()).await?;
/// println!("stopped after {last:?}");
/// # Ok(())
/// # }
/// ```
pub struct Watcher {
    rpc: RetryingRpc<Arc<dyn ChainRpc>>,
    plugins: PluginRegistry,
    config: WatcherConfig,
}

impl Watcher {
    /// Wrap `rpc` with retries per `config` and validate the configuration.
    pub fn new(rpc: Arc<dyn ChainRpc>, config: WatcherConfig) -> Result<Self, WatcherError> {
        config.validate()?;
        Ok(Self {
            rpc: RetryingRpc::new(rpc, RetryConfig::from(&config)),
            plugins: PluginRegistry::new(),
            config,
        })
    }

    /// Watcher over a JSON-RPC HTTP endpoint.
    pub fn http(url: impl Into<String>, config: WatcherConfig) -> Result<Self, WatcherError> {
        let transport = HttpTransport::default_for(url)?;
        Self::new(Arc::new(EthRpcClient::new(transport)), config)
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn register_block_plugin(&mut self, plugin: impl BlockPlugin + 'static) {
        self.plugins.register_block_plugin(Arc::new(plugin));
    }

    pub fn register_tx_plugin(&mut self, plugin: impl TxPlugin + 'static) {
        self.plugins.register_tx_plugin(Arc::new(plugin));
    }

    pub fn register_tx_receipt_plugin(&mut self, plugin: impl TxReceiptPlugin + 'static) {
        self.plugins.register_tx_receipt_plugin(Arc::new(plugin));
    }

    pub fn register_receipt_log_plugin(
        &mut self,
        plugin: impl ReceiptLogPlugin + 'static,
    ) -> Result<(), WatcherError> {
        self.plugins.register_receipt_log_plugin(Arc::new(plugin))
    }

    /// Watch forward from the current head until `cancel` fires.
    pub async fn run_until_cancelled(
        &self,
        cancel: CancellationToken,
    ) -> Result<Option<u64>, RunError> {
        self.run(StartPosition::Head, cancel).await
    }

    /// Process from `height` onward (backfilling if it is in the past) until
    /// `cancel` fires.
    pub async fn run_from_block(
        &self,
        height: u64,
        cancel: CancellationToken,
    ) -> Result<Option<u64>, RunError> {
        self.run(StartPosition::Block(height), cancel).await
    }

    pub async fn run(
        &self,
        start: StartPosition,
        cancel: CancellationToken,
    ) -> Result<Option<u64>, RunError> {
        Poller::new(&self.rpc, &self.plugins, &self.config, start)
            .run(&cancel)
            .await
    }
}
