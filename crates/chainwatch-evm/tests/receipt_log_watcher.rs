mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use chainwatch_core::error::{RpcError, WatcherError};
use chainwatch_core::ReceiptLogWatcherConfig;
use chainwatch_evm::{handler_fn, ReceiptLogWatcher, StartPosition};

use common::{MockChain, CONTRACT, OTHER, TOPIC_A, TOPIC_B};

type Ranges = Arc<Mutex<Vec<(u64, u64, bool, usize)>>>;

fn config(step: u64, emit_empty_ranges: bool) -> ReceiptLogWatcherConfig {
    ReceiptLogWatcherConfig {
        step_size_for_big_lag: step,
        poll_interval_secs: 1,
        max_rpc_retries: 2,
        emit_empty_ranges,
    }
}

fn cancel_after(cancel: &CancellationToken, after: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        cancel.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn catch_up_batches_then_tip_range() {
    let chain = MockChain::with_head(70);
    let cancel = CancellationToken::new();
    let ranges: Ranges = Arc::default();

    let sink = ranges.clone();
    let stop = cancel.clone();
    let watcher = ReceiptLogWatcher::new(
        chain.clone(),
        CONTRACT,
        vec![TOPIC_A.to_string()],
        StartPosition::Block(50),
        config(5, true),
        handler_fn(move |from, to, logs, up_to_head| {
            assert!(logs
                .iter()
                .all(|log| log.log_index == 0 && (from..=to).contains(&log.block_number)));
            sink.lock().unwrap().push((from, to, up_to_head, logs.len()));
            if to == 70 {
                stop.cancel();
            }
            Ok(())
        }),
    )
    .unwrap();

    let last = watcher.run(cancel).await.unwrap();

    assert_eq!(last, Some(70));
    assert_eq!(
        *ranges.lock().unwrap(),
        vec![
            (50, 54, false, 5),
            (55, 59, false, 5),
            (60, 64, false, 5),
            (65, 69, false, 5),
            (70, 70, true, 1),
        ]
    );
    assert_eq!(chain.calls("eth_getLogs"), 5);
    assert_eq!(chain.calls("eth_getBlockByNumber"), 0);
}

#[tokio::test(start_paused = true)]
async fn logs_within_a_range_are_ordered() {
    let chain = MockChain::with_head(3);
    let cancel = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let stop = cancel.clone();
    let watcher = ReceiptLogWatcher::new(
        chain.clone(),
        CONTRACT,
        vec![TOPIC_B.to_string(), TOPIC_A.to_string()],
        StartPosition::Block(1),
        config(10, false),
        handler_fn(move |_, to, logs, _| {
            sink.lock()
                .unwrap()
                .extend(logs.iter().map(|log| (log.block_number, log.log_index)));
            if to == 3 {
                stop.cancel();
            }
            Ok(())
        }),
    )
    .unwrap();

    watcher.run(cancel).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1)]
    );
}

#[tokio::test(start_paused = true)]
async fn empty_ranges_are_skipped_unless_requested() {
    let chain = MockChain::with_head(20);
    let cancel = CancellationToken::new();
    let calls = Arc::new(Mutex::new(0u32));

    let count = calls.clone();
    // OTHER never emits TOPIC_B.
    let watcher = ReceiptLogWatcher::new(
        chain.clone(),
        OTHER,
        vec![TOPIC_B.to_string()],
        StartPosition::Block(11),
        config(5, false),
        handler_fn(move |_, _, _, _| {
            *count.lock().unwrap() += 1;
            Ok(())
        }),
    )
    .unwrap();

    cancel_after(&cancel, Duration::from_secs(30));
    let last = watcher.run(cancel).await.unwrap();

    assert_eq!(last, Some(20));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn handler_error_stops_after_last_completed_range() {
    let chain = MockChain::with_head(30);
    let watcher = ReceiptLogWatcher::new(
        chain.clone(),
        CONTRACT,
        vec![TOPIC_A.to_string()],
        StartPosition::Block(1),
        config(10, true),
        handler_fn(|from, _, _, _| {
            if from > 1 {
                return Err(WatcherError::plugin("sink", "disk full"));
            }
            Ok(())
        }),
    )
    .unwrap();

    let err = watcher.run(CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.last_processed, Some(10));
    assert!(matches!(err.source, WatcherError::Plugin { .. }));
}

#[tokio::test(start_paused = true)]
async fn rpc_failure_surfaces_after_retries() {
    let chain = MockChain::with_head(30);
    chain.fail_head(RpcError::Timeout { ms: 30_000 });
    let watcher = ReceiptLogWatcher::new(
        chain.clone(),
        CONTRACT,
        vec![TOPIC_A.to_string()],
        StartPosition::Head,
        config(10, true),
        handler_fn(|_, _, _, _| Ok(())),
    )
    .unwrap();

    let err = watcher.run(CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.last_processed, None);
    assert!(err.source.is_rpc());
    assert_eq!(chain.calls("eth_blockNumber"), 3);
}

#[test]
fn construction_is_validated() {
    let chain = MockChain::with_head(0);
    let build = |contract: &str, topics: Vec<String>, cfg: ReceiptLogWatcherConfig| {
        ReceiptLogWatcher::new(
            chain.clone(),
            contract,
            topics,
            StartPosition::Head,
            cfg,
            handler_fn(|_, _, _, _| Ok(())),
        )
    };

    assert!(build(CONTRACT, vec![TOPIC_A.into()], config(10, false)).is_ok());
    assert!(build(" ", vec![TOPIC_A.into()], config(10, false)).is_err());
    assert!(build(CONTRACT, vec![], config(10, false)).is_err());
    assert!(build(CONTRACT, vec![TOPIC_A.into()], config(0, false)).is_err());
}

#[allow(deprecated)]
mod legacy {
    use super::*;
    use chainwatch_evm::listen_for_receipt_logs;

    #[tokio::test(start_paused = true)]
    async fn calls_handler_once_per_log() {
        let chain = MockChain::with_head(12);
        let cancel = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let stop = cancel.clone();
        let last = listen_for_receipt_logs(
            chain.clone(),
            StartPosition::Block(10),
            CONTRACT,
            &[TOPIC_A.to_string(), TOPIC_B.to_string()],
            None,
            cancel,
            move |log| {
                assert!(!log.is_removed);
                sink.lock().unwrap().push((log.block_number, log.log_index));
                if log.block_number == 12 {
                    stop.cancel();
                }
            },
        )
        .await;

        assert_eq!(last, Some(12));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(10, 0), (10, 1), (11, 0), (11, 1), (12, 0), (12, 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_retries() {
        let chain = MockChain::with_head(12);
        chain.fail_head(RpcError::Http("502 Bad Gateway".into()));

        let last = listen_for_receipt_logs(
            chain.clone(),
            StartPosition::Head,
            CONTRACT,
            &[TOPIC_A.to_string()],
            Some(0),
            CancellationToken::new(),
            |_| {},
        )
        .await;

        assert_eq!(last, None);
        assert_eq!(chain.calls("eth_blockNumber"), 6);
    }
}
