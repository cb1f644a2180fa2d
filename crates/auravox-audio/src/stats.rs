//! Reading progress estimates.

use auravox_core::SegmentStore;
use serde::{Deserialize, Serialize};

/// Baseline reading pace used for remaining-time estimates, before the
/// playback speed multiplier.
pub const WORDS_PER_MINUTE: f64 = 130.0;

/// Progress snapshot for the stats panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStats {
    /// Whole-percent progress through the document, counting the active
    /// segment as read.
    pub percent: u8,
    /// Estimated minutes left at the current playback speed.
    pub remaining_minutes: u64,
}

impl ReadingStats {
    /// Human-readable remaining time, e.g. `"1h 5m"` or `"12m"`.
    #[must_use]
    pub fn format_remaining(&self) -> String {
        let hours = self.remaining_minutes / 60;
        let minutes = self.remaining_minutes % 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }
}

/// Compute progress for `active_index` within `store` at playback
/// `speed`. An empty store reports zero progress and zero time left.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn reading_stats(store: &SegmentStore, active_index: usize, speed: f32) -> ReadingStats {
    if store.is_empty() {
        return ReadingStats {
            percent: 0,
            remaining_minutes: 0,
        };
    }

    let total = store.len();
    let position = active_index.min(total - 1);
    let percent = (((position + 1) as f64 / total as f64) * 100.0).round() as u8;

    let remaining_words: usize = store
        .iter()
        .skip(position + 1)
        .map(auravox_core::Segment::word_count)
        .sum();
    let speed = f64::from(speed).max(0.1);
    let remaining_minutes = (remaining_words as f64 / (WORDS_PER_MINUTE * speed)).ceil() as u64;

    ReadingStats {
        percent,
        remaining_minutes,
    }
}
