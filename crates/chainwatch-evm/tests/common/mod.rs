//! Scripted in-memory chain for watcher tests.
//!
//! Blocks are generated on demand. Block `n` on branch `b` has hash
//! `0x{b:04x}{n:08x}`; a reorg starts a new branch at some height, which
//! replaces every block at or above it. Each block carries two transactions
//! and three logs:
//!
//! | log | tx | address    | first topic |
//! |-----|----|------------|-------------|
//! | 0   | 0  | `CONTRACT` | `TOPIC_A`   |
//! | 1   | 0  | `CONTRACT` | `TOPIC_B`   |
//! | 2   | 1  | `OTHER`    | `TOPIC_A`   |
//!
//! Transaction 0 is sent to `CONTRACT`, transaction 1 to `OTHER`.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chainwatch_core::error::RpcError;
use chainwatch_core::types::{hash_eq, Block, Receipt, ReceiptLog, Transaction};
use chainwatch_rpc::{ChainRpc, LogQuery};

pub const CONTRACT: &str = "0xC0FFEE0000000000000000000000000000000001";
pub const OTHER: &str = "0x0000000000000000000000000000000000000BAD";
pub const TOPIC_A: &str = "0xaaaa";
pub const TOPIC_B: &str = "0xbbbb";

#[derive(Default)]
struct State {
    head: u64,
    /// `(height, branch)` in creation order; the latest fork at or below a
    /// height decides that height's branch.
    forks: Vec<(u64, u32)>,
    calls: HashMap<&'static str, u32>,
    head_failure: Option<RpcError>,
    block_failures: HashMap<u64, RpcError>,
}

impl State {
    fn branch_of(&self, number: u64) -> u32 {
        self.forks
            .iter()
            .rev()
            .find(|(height, _)| *height <= number)
            .map(|(_, branch)| *branch)
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
}

pub fn block_hash(number: u64, branch: u32) -> String {
    format!("0x{branch:04x}{number:08x}")
}

pub fn tx_hash(number: u64, branch: u32, index: u64) -> String {
    format!("0x{branch:04x}{number:08x}{index:04x}")
}

fn parse_tx_hash(hash: &str) -> Option<(u64, u32, u64)> {
    let digits = hash.strip_prefix("0x")?;
    if digits.len() != 16 {
        return None;
    }
    let branch = u32::from_str_radix(&digits[0..4], 16).ok()?;
    let number = u64::from_str_radix(&digits[4..12], 16).ok()?;
    let index = u64::from_str_radix(&digits[12..16], 16).ok()?;
    Some((number, branch, index))
}

impl MockChain {
    pub fn with_head(head: u64) -> Arc<Self> {
        let chain = Self::default();
        chain.state.lock().unwrap().head = head;
        Arc::new(chain)
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    /// Replace every block at or above `height` with a new branch.
    pub fn reorg_from(&self, height: u64) -> u32 {
        let mut state = self.state.lock().unwrap();
        let branch = state.forks.iter().map(|(_, b)| *b).max().unwrap_or(0) + 1;
        state.forks.push((height, branch));
        branch
    }

    pub fn branch_of(&self, number: u64) -> u32 {
        self.state.lock().unwrap().branch_of(number)
    }

    pub fn canonical_hash(&self, number: u64) -> String {
        block_hash(number, self.branch_of(number))
    }

    /// Every `eth_blockNumber` call fails with `error`.
    pub fn fail_head(&self, error: RpcError) {
        self.state.lock().unwrap().head_failure = Some(error);
    }

    /// Fetching block `number` fails with `error`.
    pub fn fail_block(&self, number: u64, error: RpcError) {
        self.state.lock().unwrap().block_failures.insert(number, error);
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, method: &'static str) {
        *self.state.lock().unwrap().calls.entry(method).or_default() += 1;
    }

    fn transaction(number: u64, branch: u32, index: u64) -> Transaction {
        Transaction {
            hash: tx_hash(number, branch, index),
            block_number: Some(number),
            block_hash: Some(block_hash(number, branch)),
            transaction_index: Some(index),
            from: "0x00000000000000000000000000000000000a11ce".into(),
            to: Some(if index == 0 { CONTRACT } else { OTHER }.into()),
            value: "0x0".into(),
            input: "0x".into(),
            nonce: number,
        }
    }

    fn logs_in_block(number: u64, branch: u32) -> Vec<ReceiptLog> {
        [(0, 0, CONTRACT, TOPIC_A), (1, 0, CONTRACT, TOPIC_B), (2, 1, OTHER, TOPIC_A)]
            .into_iter()
            .map(|(log_index, tx_index, address, topic)| ReceiptLog {
                // Lowercased so matching has to ignore case.
                address: address.to_lowercase(),
                topics: vec![topic.to_string(), "0x01".to_string()],
                data: "0x".into(),
                block_number: number,
                block_hash: block_hash(number, branch),
                transaction_hash: tx_hash(number, branch, tx_index),
                transaction_index: tx_index,
                log_index,
                removed: false,
            })
            .collect()
    }

    fn build_block(state: &State, number: u64) -> Block {
        let branch = state.branch_of(number);
        let parent_hash = match number.checked_sub(1) {
            Some(parent) => block_hash(parent, state.branch_of(parent)),
            None => "0x0".to_string(),
        };
        Block {
            number,
            hash: block_hash(number, branch),
            parent_hash,
            timestamp: 1_700_000_000 + number as i64 * 12,
            transactions: (0..2).map(|i| Self::transaction(number, branch, i)).collect(),
        }
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn current_block_number(&self) -> Result<u64, RpcError> {
        self.record("eth_blockNumber");
        let state = self.state.lock().unwrap();
        match &state.head_failure {
            Some(e) => Err(e.clone()),
            None => Ok(state.head),
        }
    }

    async fn block_by_number(&self, number: u64) -> Result<Block, RpcError> {
        self.record("eth_getBlockByNumber");
        let state = self.state.lock().unwrap();
        if let Some(e) = state.block_failures.get(&number) {
            return Err(e.clone());
        }
        if number > state.head {
            return Err(RpcError::empty("eth_getBlockByNumber"));
        }
        Ok(Self::build_block(&state, number))
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, RpcError> {
        self.record("eth_getTransactionByHash");
        let (number, branch, index) =
            parse_tx_hash(hash).ok_or_else(|| RpcError::empty("eth_getTransactionByHash"))?;
        Ok(Self::transaction(number, branch, index))
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Receipt, RpcError> {
        self.record("eth_getTransactionReceipt");
        let (number, branch, index) =
            parse_tx_hash(hash).ok_or_else(|| RpcError::empty("eth_getTransactionReceipt"))?;
        Ok(Receipt {
            transaction_hash: hash.to_string(),
            transaction_index: index,
            block_number: number,
            block_hash: block_hash(number, branch),
            status: Some(1),
            gas_used: 21_000,
            contract_address: None,
            logs: Self::logs_in_block(number, branch)
                .into_iter()
                .filter(|log| log.transaction_index == index)
                .collect(),
        })
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ReceiptLog>, RpcError> {
        self.record("eth_getLogs");
        let state = self.state.lock().unwrap();
        let to = query.to_block.min(state.head);
        let mut logs = Vec::new();
        for number in query.from_block..=to {
            let branch = state.branch_of(number);
            logs.extend(Self::logs_in_block(number, branch).into_iter().filter(|log| {
                let address_ok = query.addresses.is_empty()
                    || query.addresses.iter().any(|a| hash_eq(a, &log.address));
                let topic_ok = query.topics.is_empty()
                    || query.topics.iter().any(|t| hash_eq(t, &log.topics[0]));
                address_ok && topic_ok
            }));
        }
        Ok(logs)
    }
}
