//! Range planning shared by the block watcher and the receipt-log watcher.
//!
//! Each iteration compares the next unprocessed height against the chain
//! head. A lag above the step size fetches a whole batch (catch-up mode);
//! anything smaller fetches exactly one block (tip-following mode) so a fork
//! near the head is noticed as early as possible.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Where a run begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// The chain head observed on the first iteration. Watches forward only.
    Head,
    /// An explicit height, possibly in the past.
    Block(u64),
}

/// An inclusive block range chosen for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub from: u64,
    pub to: u64,
    /// `true` when the range was sized for catch-up rather than tip-following.
    pub catch_up: bool,
}

/// Tracks `next block to process` for one run.
#[derive(Debug, Clone)]
pub struct Advancement {
    next: Option<u64>,
    step_size: u64,
}

impl Advancement {
    pub fn new(start: StartPosition, step_size: u64) -> Self {
        let next = match start {
            StartPosition::Head => None,
            StartPosition::Block(n) => Some(n),
        };
        Self {
            next,
            step_size: step_size.max(1),
        }
    }

    /// Next height to fetch; `None` until the head sentinel is resolved.
    pub fn next(&self) -> Option<u64> {
        self.next
    }

    /// The range to fetch given the current head, or `None` when nothing new
    /// is available. Resolves the head sentinel on first use.
    pub fn plan(&mut self, highest: u64) -> Option<FetchRange> {
        let next = *self.next.get_or_insert(highest);
        if next > highest {
            return None;
        }
        let lag = highest - next + 1;
        if lag > self.step_size {
            Some(FetchRange {
                from: next,
                to: next + self.step_size - 1,
                catch_up: true,
            })
        } else {
            Some(FetchRange {
                from: next,
                to: next,
                catch_up: false,
            })
        }
    }

    /// Mark `number` as fully processed.
    pub fn advance_past(&mut self, number: u64) {
        self.next = Some(number + 1);
    }

    /// Move back to `number` after a reorg.
    pub fn rewind_to(&mut self, number: u64) {
        self.next = Some(number);
    }

    /// Last fully processed height. A caller resuming from `last + 1` skips
    /// nothing.
    pub fn last_processed(&self) -> Option<u64> {
        self.next?.checked_sub(1)
    }
}

/// Sleep for `interval` or until `cancel` fires, whichever comes first.
pub async fn idle(interval: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(interval) => {}
    }
}
