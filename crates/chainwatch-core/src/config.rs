//! Watcher configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WatcherError;

/// Batch size used in catch-up mode when none is configured.
pub const DEFAULT_STEP_SIZE_FOR_BIG_LAG: u64 = 10;

fn default_step_size() -> u64 { DEFAULT_STEP_SIZE_FOR_BIG_LAG }
fn default_poll_interval_ms() -> u64 { 3_000 }
fn default_poll_interval_secs() -> u64 { 3 }
fn default_max_rpc_retries() -> u32 { 5 }
fn default_retry_base_delay_ms() -> u64 { 500 }
fn default_confirmation_window() -> usize { 32 }

/// Configuration for a block watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Blocks fetched per iteration while the lag exceeds this value.
    #[serde(default = "default_step_size")]
    pub step_size_for_big_lag: u64,
    /// Idle sleep when no new block is available (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Retries per RPC call after the first attempt.
    #[serde(default = "default_max_rpc_retries")]
    pub max_rpc_retries: u32,
    /// Backoff unit: the n-th retry waits `n × retry_base_delay_ms`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Number of recent block fingerprints kept for reorg detection.
    #[serde(default = "default_confirmation_window")]
    pub confirmation_window: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            step_size_for_big_lag: default_step_size(),
            poll_interval_ms: default_poll_interval_ms(),
            max_rpc_retries: default_max_rpc_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            confirmation_window: default_confirmation_window(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Reject values the advancement loop cannot work with.
    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.step_size_for_big_lag == 0 {
            return Err(WatcherError::config("step_size_for_big_lag must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(WatcherError::config("poll_interval_ms must be > 0"));
        }
        if self.confirmation_window == 0 {
            return Err(WatcherError::config("confirmation_window must be > 0"));
        }
        Ok(())
    }
}

/// Configuration for a receipt-log range watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLogWatcherConfig {
    #[serde(default = "default_step_size")]
    pub step_size_for_big_lag: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_rpc_retries")]
    pub max_rpc_retries: u32,
    /// Invoke the handler for ranges without any matching log.
    #[serde(default)]
    pub emit_empty_ranges: bool,
}

impl Default for ReceiptLogWatcherConfig {
    fn default() -> Self {
        Self {
            step_size_for_big_lag: default_step_size(),
            poll_interval_secs: default_poll_interval_secs(),
            max_rpc_retries: default_max_rpc_retries(),
            emit_empty_ranges: false,
        }
    }
}

impl ReceiptLogWatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.step_size_for_big_lag == 0 {
            return Err(WatcherError::config("step_size_for_big_lag must be > 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(WatcherError::config("poll_interval_secs must be > 0"));
        }
        Ok(())
    }
}
