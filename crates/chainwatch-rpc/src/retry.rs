//! Linear backoff retry policy.

use std::time::Duration;

use chainwatch_core::config::WatcherConfig;

/// Configuration for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// The n-th retry waits `n × base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&WatcherConfig::default())
    }
}

impl From<&WatcherConfig> for RetryConfig {
    fn from(cfg: &WatcherConfig) -> Self {
        Self {
            max_retries: cfg.max_rpc_retries,
            base_delay: cfg.retry_base_delay(),
        }
    }
}

/// Stateless retry policy: computes the next delay from the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the delay before the `attempt`-th retry (1-based).
    /// Returns `None` if `attempt` exceeds `max_retries`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        Some(self.config.base_delay.saturating_mul(attempt))
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }
}
