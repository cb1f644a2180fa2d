//! Per-context audio resource cache.
//!
//! Every cached clip is tagged with the [`ReadingContext`] it was
//! synthesized under. A lookup only hits when the stored context equals
//! the caller's, so audio generated for an old voice or an old document
//! can never be served into the current session.
//!
//! Clips are reference counted: the cache holds one [`AudioHandle`] per
//! entry and dropping it is the release. Eviction and invalidation are
//! therefore synchronous and deterministic, which the session relies on
//! when it swaps voices.

use std::collections::HashMap;
use std::sync::Arc;

use auravox_core::AudioClip;
use tracing::trace;

/// Shared handle to a synthesized clip. Cloning is cheap; the clip is
/// freed when the last handle drops.
pub type AudioHandle = Arc<AudioClip>;

/// Identifies what a piece of audio was synthesized *for*.
///
/// Two contexts are interchangeable exactly when both fields match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingContext {
    /// Document the segment belongs to.
    pub document_id: String,
    /// Voice the audio was rendered with.
    pub voice_id: String,
}

#[derive(Debug)]
struct CacheEntry {
    context: ReadingContext,
    handle: AudioHandle,
}

/// Bounded segment-index → clip cache.
///
/// Capacity is enforced at insert time by evicting the entry whose index
/// lies farthest from the most recently inserted one. Inserts track the
/// reading position closely, so distance from the last insert is a good
/// proxy for "least likely to be played next".
#[derive(Debug)]
pub struct AudioCache {
    entries: HashMap<usize, CacheEntry>,
    capacity: usize,
    anchor: usize,
}

impl AudioCache {
    /// Create a cache holding at most `capacity` clips. A capacity of
    /// zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            anchor: 0,
        }
    }

    /// Look up the clip for `index`, hitting only when it was stored
    /// under `context`.
    #[must_use]
    pub fn get(&self, context: &ReadingContext, index: usize) -> Option<AudioHandle> {
        self.entries
            .get(&index)
            .filter(|entry| entry.context == *context)
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Store a clip for `index`, replacing (and thereby releasing) any
    /// previous entry at that index.
    pub fn insert(&mut self, context: ReadingContext, index: usize, handle: AudioHandle) {
        self.anchor = index;
        self.entries.insert(index, CacheEntry { context, handle });
        self.evict_overflow();
    }

    /// Drop every entry whose context differs from `current`. Returns the
    /// number of clips released.
    pub fn retain_context(&mut self, current: &ReadingContext) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.context == *current);
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        released
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .keys()
                .copied()
                .max_by_key(|&index| (self.anchor.abs_diff(index), index));
            match victim {
                Some(index) => {
                    trace!(index, anchor = self.anchor, "evicting cached clip");
                    self.entries.remove(&index);
                }
                None => break,
            }
        }
    }
}
