use async_trait::async_trait;

use super::ReceiptLogPlugin;
use crate::error::WatcherError;
use crate::types::{hash_eq, ReceiptLog, RemovableReceiptLog};

/// Returns `true` if `log` was emitted by `contract` with a first topic in
/// `topics`. Comparisons ignore hex case. An empty topic list matches nothing.
pub fn log_matches(contract: &str, topics: &[String], log: &ReceiptLog) -> bool {
    if !hash_eq(&log.address, contract) {
        return false;
    }
    match log.first_topic() {
        Some(first) => topics.iter().any(|t| hash_eq(t, first)),
        None => false,
    }
}

/// Hands every matching log to a callback.
pub struct SimpleReceiptLogPlugin {
    contract: String,
    topics: Vec<String>,
    callback: Box<dyn Fn(&RemovableReceiptLog) + Send + Sync>,
}

impl SimpleReceiptLogPlugin {
    pub fn new<S: Into<String>>(
        contract: impl Into<String>,
        topics: impl IntoIterator<Item = S>,
        callback: impl Fn(&RemovableReceiptLog) + Send + Sync + 'static,
    ) -> Self {
        Self {
            contract: contract.into(),
            topics: topics.into_iter().map(Into::into).collect(),
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl ReceiptLogPlugin for SimpleReceiptLogPlugin {
    fn from_contract(&self) -> &str {
        &self.contract
    }

    fn interested_topics(&self) -> &[String] {
        &self.topics
    }

    async fn accept(&self, log: &RemovableReceiptLog) -> Result<(), WatcherError> {
        (self.callback)(log);
        Ok(())
    }
}
