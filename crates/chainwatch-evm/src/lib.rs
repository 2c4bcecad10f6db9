//! chainwatch-evm: advancement loop and watchers for EVM chains.

pub mod builder;
pub mod engine;
pub mod legacy;
pub mod poller;
pub mod receipt_log_watcher;
pub mod watcher;

pub use builder::WatcherBuilder;
pub use engine::{Advancement, FetchRange, StartPosition};
#[allow(deprecated)]
pub use legacy::listen_for_receipt_logs;
pub use poller::{Poller, ProcessedBlock};
pub use receipt_log_watcher::{handler_fn, FnHandler, ReceiptLogHandler, ReceiptLogWatcher};
pub use watcher::Watcher;
