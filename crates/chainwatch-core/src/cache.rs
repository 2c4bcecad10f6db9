//! Chain state cache: a bounded, ordered window of recently processed blocks.
//!
//! The cache is owned by a single advancement loop and holds at most
//! `window` entries, oldest evicted first. Entries are anything that can
//! yield a [`BlockFingerprint`]; the engine stores the delivered payloads
//! alongside so they can be retracted after a reorg.

use std::collections::VecDeque;

use crate::types::BlockFingerprint;

/// Anything the cache can key by block number.
pub trait Fingerprinted {
    fn fingerprint(&self) -> &BlockFingerprint;
}

impl Fingerprinted for BlockFingerprint {
    fn fingerprint(&self) -> &BlockFingerprint {
        self
    }
}

/// Bounded FIFO of processed blocks, ascending by block number.
#[derive(Debug, Clone)]
pub struct ChainStateCache<T = BlockFingerprint> {
    entries: VecDeque<T>,
    window: usize,
}

impl<T: Fingerprinted> ChainStateCache<T> {
    /// Create an empty cache retaining at most `window` entries.
    pub fn new(window: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Append an entry, evicting the oldest one if the window is full.
    ///
    /// A window of `0` keeps nothing and disables reorg detection.
    pub fn record(&mut self, entry: T) {
        if self.window == 0 {
            return;
        }
        if self.entries.len() >= self.window {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the entry cached for `number`, if any.
    pub fn lookup(&self, number: u64) -> Option<&T> {
        let oldest = self.oldest()?.fingerprint().number;
        let idx = number.checked_sub(oldest)? as usize;
        // Fast path when the window is contiguous; fall back to a scan.
        match self.entries.get(idx) {
            Some(e) if e.fingerprint().number == number => Some(e),
            _ => self.entries.iter().find(|e| e.fingerprint().number == number),
        }
    }

    /// Fingerprints of every cached entry at or above `number`, descending.
    pub fn fingerprints_from(&self, number: u64) -> Vec<&BlockFingerprint> {
        self.entries
            .iter()
            .rev()
            .map(Fingerprinted::fingerprint)
            .take_while(|fp| fp.number >= number)
            .collect()
    }

    /// Remove and return every entry at or above `number`, descending.
    pub fn truncate_from(&mut self, number: u64) -> Vec<T> {
        let mut dropped = Vec::new();
        while let Some(back) = self.entries.back() {
            if back.fingerprint().number < number {
                break;
            }
            if let Some(entry) = self.entries.pop_back() {
                dropped.push(entry);
            }
        }
        dropped
    }

    /// The most recently recorded entry.
    pub fn head(&self) -> Option<&T> {
        self.entries.back()
    }

    /// The oldest entry still in the window.
    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
