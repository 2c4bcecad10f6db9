//! Reorg detection and fork-point resolution.
//!
//! A freshly fetched block at height `H` is checked against the cached
//! fingerprint at `H - 1`. On a parent-hash mismatch the cache is walked
//! downward, re-fetching canonical ancestors, until a cached block matches
//! the canonical chain (the common ancestor) or the window runs out.

use async_trait::async_trait;

use crate::cache::{ChainStateCache, Fingerprinted};
use crate::error::WatcherError;
use crate::types::{hash_eq, BlockFingerprint};

/// Read access to the node's current canonical chain.
#[async_trait]
pub trait CanonicalChain: Send + Sync {
    /// Fingerprint of the canonical block at `number`.
    async fn canonical_fingerprint(&self, number: u64) -> Result<BlockFingerprint, WatcherError>;
}

/// How a new block relates to the cached chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// The block's parent is the cached head.
    Extends,
    /// Nothing cached at `H - 1`, and nothing at or above it either.
    Unlinked,
    /// The block does not build on the cached chain.
    Forked,
}

/// Describes a detected chain reorganization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgEvent {
    /// Height of the block that exposed the fork.
    pub detected_at: u64,
    /// Cached blocks no longer on the canonical chain, highest first.
    pub invalidated: Vec<BlockFingerprint>,
    /// Highest cached block still canonical, `None` if the window ran out.
    pub common_ancestor: Option<u64>,
    /// First height to re-deliver from the new chain.
    pub resume_from: u64,
    /// The fork is deeper than the cache window; `resume_from` is best-effort.
    pub window_exhausted: bool,
}

impl ReorgEvent {
    pub fn depth(&self) -> u64 {
        self.invalidated.len() as u64
    }
}

/// Detects reorgs against a [`ChainStateCache`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReorgDetector;

impl ReorgDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `block` against the cached chain. Pure, no I/O.
    pub fn continuity<T: Fingerprinted>(
        &self,
        cache: &ChainStateCache<T>,
        block: &BlockFingerprint,
    ) -> Continuity {
        let Some(head) = cache.head().map(Fingerprinted::fingerprint) else {
            return Continuity::Unlinked;
        };
        if head.number + 1 < block.number {
            Continuity::Unlinked
        } else if head.number + 1 == block.number {
            if hash_eq(&block.parent_hash, &head.hash) {
                Continuity::Extends
            } else {
                Continuity::Forked
            }
        } else {
            // Heights at or above `block` were already processed.
            Continuity::Forked
        }
    }

    /// Check `block` and, if it forks from the cache, resolve the fork point.
    ///
    /// Returns `None` when the block can be appended as-is.
    pub async fn check<T, C>(
        &self,
        cache: &ChainStateCache<T>,
        block: &BlockFingerprint,
        chain: &C,
    ) -> Result<Option<ReorgEvent>, WatcherError>
    where
        T: Fingerprinted + Send + Sync,
        C: CanonicalChain + ?Sized,
    {
        match self.continuity(cache, block) {
            Continuity::Extends | Continuity::Unlinked => Ok(None),
            Continuity::Forked => self.resolve(cache, block, chain).await.map(Some),
        }
    }

    /// Walk the cache downward from the head until a cached hash matches the
    /// canonical chain.
    pub async fn resolve<T, C>(
        &self,
        cache: &ChainStateCache<T>,
        block: &BlockFingerprint,
        chain: &C,
    ) -> Result<ReorgEvent, WatcherError>
    where
        T: Fingerprinted + Send + Sync,
        C: CanonicalChain + ?Sized,
    {
        let mut invalidated = Vec::new();
        let mut common_ancestor = None;
        // Canonical block whose parent hash is compared with the next cached entry.
        let mut child = block.clone();

        for cached in cache.fingerprints_from(0) {
            if cached.number >= block.number {
                invalidated.push(cached.clone());
                continue;
            }
            if child.number != cached.number + 1 {
                child = chain.canonical_fingerprint(cached.number + 1).await?;
            }
            if hash_eq(&child.parent_hash, &cached.hash) {
                common_ancestor = Some(cached.number);
                break;
            }
            invalidated.push(cached.clone());
        }

        let window_exhausted = common_ancestor.is_none();
        let resume_from = match (common_ancestor, invalidated.last()) {
            (Some(ancestor), _) => ancestor + 1,
            (None, Some(deepest)) => deepest.number,
            (None, None) => block.number,
        };

        tracing::warn!(
            at = block.number,
            depth = invalidated.len(),
            common_ancestor = ?common_ancestor,
            resume_from,
            "Reorg detected"
        );
        if window_exhausted {
            tracing::warn!(
                window = cache.window(),
                resume_from,
                "Reorg deeper than the cache window, resuming from the deepest cached block"
            );
        }

        Ok(ReorgEvent {
            detected_at: block.number,
            invalidated,
            common_ancestor,
            resume_from,
            window_exhausted,
        })
    }
}
