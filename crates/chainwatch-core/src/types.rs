//! Shared types for the watcher pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── BlockFingerprint ─────────────────────────────────────────────────────────

/// The `(number, hash, parent_hash)` triple used for continuity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFingerprint {
    /// Block number.
    pub number: u64,
    /// Block hash (`0x…`).
    pub hash: String,
    /// Parent block hash (`0x…`).
    pub parent_hash: String,
}

impl BlockFingerprint {
    pub fn new(number: u64, hash: impl Into<String>, parent_hash: impl Into<String>) -> Self {
        Self {
            number,
            hash: hash.into(),
            parent_hash: parent_hash.into(),
        }
    }

    /// Returns `true` if `parent` is the direct parent of `self`.
    pub fn extends(&self, parent: &BlockFingerprint) -> bool {
        self.number == parent.number + 1 && hash_eq(&self.parent_hash, &parent.hash)
    }

    /// Same block identity: equal number and hash.
    pub fn same_block(&self, other: &BlockFingerprint) -> bool {
        self.number == other.number && hash_eq(&self.hash, &other.hash)
    }
}

/// Compare two hex strings (hashes, addresses, topics) ignoring ASCII case.
pub fn hash_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

// ─── Block ────────────────────────────────────────────────────────────────────

/// A block with its full transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn fingerprint(&self) -> BlockFingerprint {
        BlockFingerprint::new(self.number, self.hash.clone(), self.parent_hash.clone())
    }

    /// Block timestamp as a UTC datetime, `None` if out of range.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

// ─── Transaction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<u64>,
    pub from: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    /// Wei value as a `0x` hex quantity.
    pub value: String,
    pub input: String,
    pub nonce: u64,
}

impl Transaction {
    /// Returns `true` if the transaction is sent to `address` (case-insensitive).
    pub fn is_sent_to(&self, address: &str) -> bool {
        self.to.as_deref().is_some_and(|to| hash_eq(to, address))
    }
}

// ─── Receipt / ReceiptLog ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub block_number: u64,
    pub block_hash: String,
    /// `Some(1)` success, `Some(0)` failure, `None` on pre-Byzantium chains.
    pub status: Option<u64>,
    pub gas_used: u64,
    pub contract_address: Option<String>,
    pub logs: Vec<ReceiptLog>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// An event log emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub block_hash: String,
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub log_index: u64,
    /// Set by the node when the log was dropped by a reorg.
    pub removed: bool,
}

impl ReceiptLog {
    pub fn first_topic(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// A transaction paired with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAndReceipt {
    pub tx: Transaction,
    pub receipt: Receipt,
}

// ─── Removable ────────────────────────────────────────────────────────────────

/// A dispatched notification.
///
/// `is_removed = true` retracts an earlier add notification for the same
/// payload identity (block number + index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removable<T> {
    pub payload: T,
    pub is_removed: bool,
}

impl<T> Removable<T> {
    pub fn added(payload: T) -> Self {
        Self {
            payload,
            is_removed: false,
        }
    }

    pub fn removed(payload: T) -> Self {
        Self {
            payload,
            is_removed: true,
        }
    }
}

impl<T> std::ops::Deref for Removable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.payload
    }
}

pub type RemovableBlock = Removable<Block>;
pub type RemovableTx = Removable<Transaction>;
pub type RemovableTxAndReceipt = Removable<TxAndReceipt>;
pub type RemovableReceiptLog = Removable<ReceiptLog>;

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_extends_parent() {
        let parent = BlockFingerprint::new(100, "0xAAA", "0x000");
        let child = BlockFingerprint::new(101, "0xbbb", "0xaaa");
        assert!(child.extends(&parent));
        assert!(!parent.extends(&child));
    }

    #[test]
    fn fingerprint_extends_false_on_gap() {
        let a = BlockFingerprint::new(100, "0xaaa", "0x000");
        let b = BlockFingerprint::new(102, "0xccc", "0xaaa");
        assert!(!b.extends(&a));
    }

    #[test]
    fn block_time_from_timestamp() {
        let block = Block {
            number: 1,
            hash: "0x1".into(),
            parent_hash: "0x0".into(),
            timestamp: 1_700_000_000,
            transactions: vec![],
        };
        assert_eq!(block.time().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(block.fingerprint().hash, "0x1");
    }

    #[test]
    fn removable_derefs_to_payload() {
        let log = ReceiptLog {
            address: "0xc0ffee".into(),
            topics: vec!["0xddf2".into()],
            data: "0x".into(),
            block_number: 7,
            block_hash: "0x7".into(),
            transaction_hash: "0xt".into(),
            transaction_index: 0,
            log_index: 3,
            removed: false,
        };
        let removed = Removable::removed(log);
        assert!(removed.is_removed);
        assert_eq!(removed.first_topic(), Some("0xddf2"));
        assert_eq!(removed.log_index, 3);
    }
}
