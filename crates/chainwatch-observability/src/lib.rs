//! # chainwatch-observability
//!
//! Logging setup for services embedding a ChainWatch watcher.
//!
//! The watcher crates only emit `tracing` events. Targets follow the crate
//! names, so verbosity can be tuned per layer:
//!
//! - `chainwatch_evm`  : loop lifecycle, fetch-mode switches, reorgs
//! - `chainwatch_rpc`  : retries and exhausted calls
//! - `chainwatch_core` : fork resolution details
//!
//! Output is human-readable text or one JSON object per line.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig, LogFormat, LogInitError};
