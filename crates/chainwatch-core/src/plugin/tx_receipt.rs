//! Stock transaction+receipt plugins.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

use super::TxReceiptPlugin;
use crate::error::WatcherError;
use crate::types::{hash_eq, ReceiptLog, RemovableTxAndReceipt, Transaction};

/// `keccak256("Transfer(address,address,uint256)")`
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

type TxFilter = Box<dyn Fn(&Transaction) -> bool + Send + Sync>;

/// Hands every transaction+receipt pair to a callback, optionally restricted
/// by a transaction predicate.
pub struct SimpleTxReceiptPlugin {
    callback: Box<dyn Fn(&RemovableTxAndReceipt) + Send + Sync>,
    filter: Option<TxFilter>,
}

impl SimpleTxReceiptPlugin {
    pub fn new(callback: impl Fn(&RemovableTxAndReceipt) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            filter: None,
        }
    }

    /// Only transactions accepted by `filter` have their receipt fetched.
    pub fn with_filter(
        mut self,
        filter: impl Fn(&Transaction) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

#[async_trait]
impl TxReceiptPlugin for SimpleTxReceiptPlugin {
    fn wants(&self, tx: &Transaction) -> bool {
        self.filter.as_ref().map_or(true, |f| f(tx))
    }

    async fn accept(&self, tx_and_receipt: &RemovableTxAndReceipt) -> Result<(), WatcherError> {
        (self.callback)(tx_and_receipt);
        Ok(())
    }
}

/// A decoded ERC20 `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub transaction_hash: String,
    pub log_index: u64,
}

impl Erc20Transfer {
    /// Decode a standard `Transfer(address indexed, address indexed, uint256)`
    /// log. Returns `None` for anything else, including ERC721 transfers
    /// (four topics) and malformed payloads.
    pub fn from_log(log: &ReceiptLog) -> Option<Self> {
        if log.topics.len() != 3 || !hash_eq(&log.topics[0], TRANSFER_TOPIC) {
            return None;
        }
        let token: Address = log.address.parse().ok()?;
        let from = Address::from_word(log.topics[1].parse::<B256>().ok()?);
        let to = Address::from_word(log.topics[2].parse::<B256>().ok()?);
        let data = log.data.trim_start_matches("0x");
        if data.is_empty() {
            return None;
        }
        let amount = U256::from_str_radix(data, 16).ok()?;
        Some(Self {
            token,
            from,
            to,
            amount,
            transaction_hash: log.transaction_hash.clone(),
            log_index: log.log_index,
        })
    }
}

/// Reports every ERC20 transfer found in a receipt as
/// `(transfer, is_removed)`.
pub struct Erc20TransferPlugin {
    callback: Box<dyn Fn(&Erc20Transfer, bool) + Send + Sync>,
}

impl Erc20TransferPlugin {
    pub fn new(callback: impl Fn(&Erc20Transfer, bool) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl TxReceiptPlugin for Erc20TransferPlugin {
    async fn accept(&self, tx_and_receipt: &RemovableTxAndReceipt) -> Result<(), WatcherError> {
        let logs = &tx_and_receipt.payload.receipt.logs;
        for transfer in logs.iter().filter_map(Erc20Transfer::from_log) {
            (self.callback)(&transfer, tx_and_receipt.is_removed);
        }
        Ok(())
    }
}
