//! Retrying decorator for any [`ChainRpc`].
//!
//! Each call is attempted up to `max_retries + 1` times. Only errors for
//! which [`RpcError::is_retryable`] holds are retried; the error of the last
//! attempt is returned unchanged.

use async_trait::async_trait;
use std::future::Future;

use chainwatch_core::error::RpcError;
use chainwatch_core::types::{Block, BlockFingerprint, Receipt, ReceiptLog, Transaction};

use crate::client::{ChainRpc, LogQuery};
use crate::retry::{RetryConfig, RetryPolicy};

pub struct RetryingRpc<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ChainRpc> RetryingRpc<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self {
            inner,
            policy: RetryPolicy::new(config),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn retry<T, F, Fut>(&self, method: &str, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RpcError>> + Send,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => match self.policy.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            method,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying rpc call"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(method, attempt, error = %e, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<C: ChainRpc> ChainRpc for RetryingRpc<C> {
    async fn current_block_number(&self) -> Result<u64, RpcError> {
        self.retry("eth_blockNumber", || self.inner.current_block_number())
            .await
    }

    async fn block_by_number(&self, number: u64) -> Result<Block, RpcError> {
        self.retry("eth_getBlockByNumber", || self.inner.block_by_number(number))
            .await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, RpcError> {
        self.retry("eth_getTransactionByHash", || {
            self.inner.transaction_by_hash(hash)
        })
        .await
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Receipt, RpcError> {
        self.retry("eth_getTransactionReceipt", || {
            self.inner.transaction_receipt(hash)
        })
        .await
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ReceiptLog>, RpcError> {
        self.retry("eth_getLogs", || self.inner.logs(query)).await
    }

    async fn block_fingerprint(&self, number: u64) -> Result<BlockFingerprint, RpcError> {
        self.retry("eth_getBlockByNumber", || self.inner.block_fingerprint(number))
            .await
    }
}
