//! Stock transaction plugins.

use async_trait::async_trait;

use super::TxPlugin;
use crate::error::WatcherError;
use crate::types::RemovableTx;

/// Reports `(tx_hash, is_removed)` for every transaction.
pub struct TxHashPlugin {
    callback: Box<dyn Fn(&str, bool) + Send + Sync>,
}

impl TxHashPlugin {
    pub fn new(callback: impl Fn(&str, bool) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl TxPlugin for TxHashPlugin {
    async fn accept(&self, tx: &RemovableTx) -> Result<(), WatcherError> {
        (self.callback)(&tx.hash, tx.is_removed);
        Ok(())
    }
}

/// Hands every transaction to a callback.
pub struct SimpleTxPlugin {
    callback: Box<dyn Fn(&RemovableTx) + Send + Sync>,
}

impl SimpleTxPlugin {
    pub fn new(callback: impl Fn(&RemovableTx) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl TxPlugin for SimpleTxPlugin {
    async fn accept(&self, tx: &RemovableTx) -> Result<(), WatcherError> {
        (self.callback)(tx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::tests::tx;
    use crate::plugin::PluginRegistry;
    use crate::types::Removable;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn hash_plugin_reports_removal_flag() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut registry = PluginRegistry::new();
        registry.register_tx_plugin(Arc::new(TxHashPlugin::new(move |hash, removed| {
            sink.lock().unwrap().push((hash.to_string(), removed));
        })));

        registry
            .dispatch_tx(&Removable::added(tx("0x01", None)))
            .await
            .unwrap();
        registry
            .dispatch_tx(&Removable::removed(tx("0x01", None)))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("0x01".to_string(), false), ("0x01".to_string(), true)]
        );
    }
}
