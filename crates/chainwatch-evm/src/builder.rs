//! Fluent builder API for block watchers.
//!
//! # Example
//!
//! ```rust,no_run
//! use chainwatch_evm::WatcherBuilder;
//!
//! let watcher = WatcherBuilder::new()
//!     .step_size_for_big_lag(20)
//!     .poll_interval_ms(1_000)
//!     .max_rpc_retries(3)
//!     .confirmation_window(64)
//!     .build_http("http://localhost:8545")
//!     .unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::config::WatcherConfig;
use chainwatch_core::error::WatcherError;
use chainwatch_rpc::ChainRpc;

use crate::watcher::Watcher;

/// Fluent builder for [`Watcher`].
#[derive(Debug, Default, Clone)]
pub struct WatcherBuilder {
    config: WatcherConfig,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Batch size used while the lag exceeds it.
    pub fn step_size_for_big_lag(mut self, step: u64) -> Self {
        self.config.step_size_for_big_lag = step;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn poll_interval(self, interval: Duration) -> Self {
        self.poll_interval_ms(interval.as_millis() as u64)
    }

    /// Retries per RPC call after the first attempt.
    pub fn max_rpc_retries(mut self, retries: u32) -> Self {
        self.config.max_rpc_retries = retries;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    /// Number of recent blocks kept for reorg detection.
    pub fn confirmation_window(mut self, window: usize) -> Self {
        self.config.confirmation_window = window;
        self
    }

    /// The validated configuration.
    pub fn build_config(self) -> Result<WatcherConfig, WatcherError> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn build(self, rpc: Arc<dyn ChainRpc>) -> Result<Watcher, WatcherError> {
        Watcher::new(rpc, self.config)
    }

    pub fn build_http(self, url: impl Into<String>) -> Result<Watcher, WatcherError> {
        Watcher::http(url, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cfg = WatcherBuilder::new().build_config().unwrap();
        assert_eq!(cfg.step_size_for_big_lag, 10);
        assert_eq!(cfg.poll_interval_ms, 3_000);
        assert_eq!(cfg.max_rpc_retries, 5);
        assert_eq!(cfg.confirmation_window, 32);
    }

    #[test]
    fn builder_custom() {
        let cfg = WatcherBuilder::new()
            .step_size_for_big_lag(5)
            .poll_interval(Duration::from_millis(250))
            .max_rpc_retries(0)
            .retry_base_delay_ms(10)
            .confirmation_window(4)
            .build_config()
            .unwrap();

        assert_eq!(cfg.step_size_for_big_lag, 5);
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.max_rpc_retries, 0);
        assert_eq!(cfg.retry_base_delay_ms, 10);
        assert_eq!(cfg.confirmation_window, 4);
    }

    #[test]
    fn invalid_step_rejected() {
        let err = WatcherBuilder::new()
            .step_size_for_big_lag(0)
            .build_config()
            .unwrap_err();
        assert!(matches!(err, WatcherError::Configuration(_)));
    }
}
