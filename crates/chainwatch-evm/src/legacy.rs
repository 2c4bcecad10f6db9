//! Deprecated per-log listener, kept for callers of the single-loop API.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use chainwatch_core::config::DEFAULT_STEP_SIZE_FOR_BIG_LAG;
use chainwatch_core::types::{Removable, RemovableReceiptLog};
use chainwatch_rpc::{ChainRpc, LogQuery, RetryConfig, RetryingRpc};

use crate::engine::{idle, Advancement, StartPosition};

const LEGACY_IDLE: Duration = Duration::from_secs(3);
const LEGACY_MAX_RETRIES: u32 = 5;

/// Single-loop log listener: one handler call per log.
///
/// `step_size` of `None` or `0` uses [`DEFAULT_STEP_SIZE_FOR_BIG_LAG`]. RPC
/// failures end the loop after 5 retries and are only logged. Returns the
/// last processed height on any exit.
#[deprecated(since = "0.2.0", note = "use `ReceiptLogWatcher` instead")]
pub async fn listen_for_receipt_logs<F>(
    rpc: Arc<dyn ChainRpc>,
    start: StartPosition,
    contract: &str,
    topics: &[String],
    step_size: Option<u64>,
    cancel: CancellationToken,
    handler: F,
) -> Option<u64>
where
    F: Fn(&RemovableReceiptLog) + Send + Sync,
{
    let step = step_size
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_STEP_SIZE_FOR_BIG_LAG);
    let rpc = RetryingRpc::new(
        rpc,
        RetryConfig {
            max_retries: LEGACY_MAX_RETRIES,
            ..RetryConfig::default()
        },
    );
    let mut advancement = Advancement::new(start, step);

    loop {
        if cancel.is_cancelled() {
            return advancement.last_processed();
        }

        let highest = match rpc.current_block_number().await {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(error = %e, "Log listener stopped");
                return advancement.last_processed();
            }
        };

        let Some(range) = advancement.plan(highest) else {
            tracing::debug!(highest, "No ready block, sleeping 3 seconds");
            idle(LEGACY_IDLE, &cancel).await;
            continue;
        };

        let query = LogQuery::new(range.from, range.to)
            .address(contract)
            .topics(topics.iter().cloned());
        let logs = match rpc.logs(&query).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::error!(error = %e, from = range.from, to = range.to, "Log listener stopped");
                return advancement.last_processed();
            }
        };

        for log in logs {
            let is_removed = log.removed;
            handler(&Removable {
                payload: log,
                is_removed,
            });
        }
        advancement.advance_past(range.to);
    }
}
