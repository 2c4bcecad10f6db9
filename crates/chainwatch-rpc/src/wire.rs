//! Node response shapes and their conversion into the watcher's model.
//!
//! Quantities arrive as `0x`-prefixed hex strings. Conversion is strict: a
//! malformed quantity is a [`RpcError::Decode`], never a silent zero.

use serde::{Deserialize, Serialize};

use chainwatch_core::error::RpcError;
use chainwatch_core::types::{Block, BlockFingerprint, Receipt, ReceiptLog, Transaction};

/// Parse a hex quantity (with or without `0x`) to u64.
pub fn parse_quantity(s: &str) -> Result<u64, RpcError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Err(RpcError::Decode(format!("empty quantity {s:?}")));
    }
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(format!("quantity {s:?}: {e}")))
}

fn parse_opt_quantity(s: Option<&str>) -> Result<Option<u64>, RpcError> {
    s.map(parse_quantity).transpose()
}

pub fn format_quantity(n: u64) -> String {
    format!("0x{n:x}")
}

/// Block header fields, as returned with `full_transactions = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeader {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
}

impl RawHeader {
    pub fn into_fingerprint(self) -> Result<BlockFingerprint, RpcError> {
        Ok(BlockFingerprint::new(
            parse_quantity(&self.number)?,
            self.hash,
            self.parent_hash,
        ))
    }
}

/// A block with full transaction objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl RawBlock {
    pub fn into_block(self) -> Result<Block, RpcError> {
        Ok(Block {
            number: parse_quantity(&self.number)?,
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: parse_quantity(&self.timestamp)? as i64,
            transactions: self
                .transactions
                .into_iter()
                .map(RawTransaction::into_transaction)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub block_number: Option<String>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub input: String,
    pub nonce: String,
}

impl RawTransaction {
    pub fn into_transaction(self) -> Result<Transaction, RpcError> {
        Ok(Transaction {
            block_number: parse_opt_quantity(self.block_number.as_deref())?,
            transaction_index: parse_opt_quantity(self.transaction_index.as_deref())?,
            nonce: parse_quantity(&self.nonce)?,
            hash: self.hash,
            block_hash: self.block_hash,
            from: self.from,
            to: self.to,
            value: self.value,
            input: self.input,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_number: String,
    pub block_hash: String,
    pub status: Option<String>,
    pub gas_used: String,
    pub contract_address: Option<String>,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

impl RawReceipt {
    pub fn into_receipt(self) -> Result<Receipt, RpcError> {
        Ok(Receipt {
            transaction_index: parse_quantity(&self.transaction_index)?,
            block_number: parse_quantity(&self.block_number)?,
            status: parse_opt_quantity(self.status.as_deref())?,
            gas_used: parse_quantity(&self.gas_used)?,
            logs: self
                .logs
                .into_iter()
                .map(RawLog::into_log)
                .collect::<Result<_, _>>()?,
            transaction_hash: self.transaction_hash,
            block_hash: self.block_hash,
            contract_address: self.contract_address,
        })
    }
}

/// A raw EVM log as returned by `eth_getLogs` or inside a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub block_hash: String,
    pub transaction_hash: String,
    pub transaction_index: String,
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    pub fn into_log(self) -> Result<ReceiptLog, RpcError> {
        Ok(ReceiptLog {
            block_number: parse_quantity(&self.block_number)?,
            transaction_index: parse_quantity(&self.transaction_index)?,
            log_index: parse_quantity(&self.log_index)?,
            removed: self.removed.unwrap_or(false),
            address: self.address,
            topics: self.topics,
            data: self.data,
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
        })
    }
}
