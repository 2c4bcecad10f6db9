//! Typed chain access.

use async_trait::async_trait;
use serde_json::{json, Value};

use chainwatch_core::error::RpcError;
use chainwatch_core::types::{
    Block, BlockFingerprint, Receipt, ReceiptLog, Transaction, TxAndReceipt,
};

use crate::transport::{call, RequestIds, RpcTransport};
use crate::wire::{format_quantity, RawBlock, RawHeader, RawLog, RawReceipt, RawTransaction};

/// An `eth_getLogs` filter over an inclusive block range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub from_block: u64,
    pub to_block: u64,
    /// Emitting contracts. Empty means any.
    pub addresses: Vec<String>,
    /// Accepted first topics. Empty means any.
    pub topics: Vec<String>,
}

impl LogQuery {
    pub fn new(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            ..Default::default()
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    pub fn topics<S: Into<String>>(mut self, topics: impl IntoIterator<Item = S>) -> Self {
        self.topics.extend(topics.into_iter().map(Into::into));
        self
    }

    fn to_filter(&self) -> Value {
        let mut filter = json!({
            "fromBlock": format_quantity(self.from_block),
            "toBlock": format_quantity(self.to_block),
        });
        if !self.addresses.is_empty() {
            filter["address"] = json!(self.addresses);
        }
        if !self.topics.is_empty() {
            filter["topics"] = json!([self.topics]);
        }
        filter
    }
}

/// Read operations the watcher needs from a node.
///
/// Every method returns [`RpcError::EmptyResult`] when the node answers
/// `null`, e.g. for a block that is not yet available.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn current_block_number(&self) -> Result<u64, RpcError>;

    /// Block with full transaction objects.
    async fn block_by_number(&self, number: u64) -> Result<Block, RpcError>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, RpcError>;

    async fn transaction_receipt(&self, hash: &str) -> Result<Receipt, RpcError>;

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ReceiptLog>, RpcError>;

    /// Header triple only. Defaults to a full block fetch.
    async fn block_fingerprint(&self, number: u64) -> Result<BlockFingerprint, RpcError> {
        Ok(self.block_by_number(number).await?.fingerprint())
    }

    /// Fetch a transaction and its receipt concurrently.
    async fn transaction_and_receipt(&self, hash: &str) -> Result<TxAndReceipt, RpcError> {
        let (tx, receipt) = tokio::try_join!(
            self.transaction_by_hash(hash),
            self.transaction_receipt(hash)
        )?;
        Ok(TxAndReceipt { tx, receipt })
    }
}

#[async_trait]
impl<C: ChainRpc + ?Sized> ChainRpc for std::sync::Arc<C> {
    async fn current_block_number(&self) -> Result<u64, RpcError> {
        (**self).current_block_number().await
    }

    async fn block_by_number(&self, number: u64) -> Result<Block, RpcError> {
        (**self).block_by_number(number).await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, RpcError> {
        (**self).transaction_by_hash(hash).await
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Receipt, RpcError> {
        (**self).transaction_receipt(hash).await
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ReceiptLog>, RpcError> {
        (**self).logs(query).await
    }

    async fn block_fingerprint(&self, number: u64) -> Result<BlockFingerprint, RpcError> {
        (**self).block_fingerprint(number).await
    }
}

/// [`ChainRpc`] over the standard `eth_*` JSON-RPC methods.
pub struct EthRpcClient<T> {
    transport: T,
    ids: RequestIds,
}

impl<T: RpcTransport> EthRpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            ids: RequestIds::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn request<R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R, RpcError> {
        let value = call(&self.transport, self.ids.next(), method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }
}

#[async_trait]
impl<T: RpcTransport> ChainRpc for EthRpcClient<T> {
    async fn current_block_number(&self) -> Result<u64, RpcError> {
        let hex: String = self.request("eth_blockNumber", vec![]).await?;
        crate::wire::parse_quantity(&hex)
    }

    async fn block_by_number(&self, number: u64) -> Result<Block, RpcError> {
        let raw: RawBlock = self
            .request(
                "eth_getBlockByNumber",
                vec![json!(format_quantity(number)), json!(true)],
            )
            .await?;
        raw.into_block()
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, RpcError> {
        let raw: RawTransaction = self
            .request("eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        raw.into_transaction()
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Receipt, RpcError> {
        let raw: RawReceipt = self
            .request("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        raw.into_receipt()
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ReceiptLog>, RpcError> {
        let raw: Vec<RawLog> = self.request("eth_getLogs", vec![query.to_filter()]).await?;
        raw.into_iter().map(RawLog::into_log).collect()
    }

    async fn block_fingerprint(&self, number: u64) -> Result<BlockFingerprint, RpcError> {
        let raw: RawHeader = self
            .request(
                "eth_getBlockByNumber",
                vec![json!(format_quantity(number)), json!(false)],
            )
            .await?;
        raw.into_fingerprint()
    }
}
