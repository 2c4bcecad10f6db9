//! Stock block plugins.

use async_trait::async_trait;

use super::BlockPlugin;
use crate::error::WatcherError;
use crate::types::RemovableBlock;

type NumberCallback = Box<dyn Fn(u64, bool) + Send + Sync>;
type BlockCallback = Box<dyn Fn(&RemovableBlock) + Send + Sync>;

/// Reports `(block_number, is_removed)` for every block.
pub struct BlockNumPlugin {
    callback: NumberCallback,
}

impl BlockNumPlugin {
    pub fn new(callback: impl Fn(u64, bool) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl BlockPlugin for BlockNumPlugin {
    async fn accept(&self, block: &RemovableBlock) -> Result<(), WatcherError> {
        (self.callback)(block.number, block.is_removed);
        Ok(())
    }
}

/// Hands every block to a callback.
pub struct SimpleBlockPlugin {
    callback: BlockCallback,
}

impl SimpleBlockPlugin {
    pub fn new(callback: impl Fn(&RemovableBlock) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl BlockPlugin for SimpleBlockPlugin {
    async fn accept(&self, block: &RemovableBlock) -> Result<(), WatcherError> {
        (self.callback)(block);
        Ok(())
    }
}
