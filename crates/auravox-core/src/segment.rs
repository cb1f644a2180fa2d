//! Text segments and the segment store.
//!
//! A [`Segment`] is one unit of text that maps to exactly one synthesis
//! call. The [`SegmentStore`] is the ordered, immutable sequence of
//! segments belonging to one document; it is built once when a document
//! is opened and discarded when the reader switches documents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ── Segment ────────────────────────────────────────────────────────

/// One unit of readable text. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position of this segment within its document (0-based).
    pub index: usize,

    /// The segment text, as produced by the ingestion layer.
    pub text: String,
}

impl Segment {
    /// Number of whitespace-separated words, used for reading-time estimates.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

// ── Segment store ──────────────────────────────────────────────────

/// Ordered, immutable sequence of segments for the active document.
///
/// Cloning is cheap (`Arc` under the hood), so the store can be handed to
/// spawned prefetch tasks without copying the document text.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Arc<[Segment]>,
}

impl SegmentStore {
    /// Build a store from segment texts, assigning indices in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<Segment> = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Segment {
                index,
                text: text.into(),
            })
            .collect();
        Self {
            segments: segments.into(),
        }
    }

    /// Get the segment at `index`, or `None` past the end of the document.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Number of segments in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the document has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over all segments in order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Case-insensitive substring search across all segments.
    ///
    /// Each hit carries a short snippet around the first match in that
    /// segment, so the UI can render a result list without re-scanning
    /// the document.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.segments
            .iter()
            .filter_map(|segment| {
                let haystack = segment.text.to_lowercase();
                haystack.find(&needle).map(|pos| SearchHit {
                    index: segment.index,
                    snippet: snippet_around(&segment.text, pos, needle.len()),
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a SegmentStore {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

// ── Search hits ────────────────────────────────────────────────────

/// A single search result: the segment to jump to plus display context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Index of the matching segment (a valid `navigate` target).
    pub index: usize,

    /// Short excerpt around the match, with ellipses where truncated.
    pub snippet: String,
}

/// Characters of context kept on each side of a match in a snippet.
const SNIPPET_CONTEXT: usize = 20;

/// Cut a snippet of `text` around the byte range `[match_start,
/// match_start + match_len)`, padded by [`SNIPPET_CONTEXT`] characters on
/// each side and marked with ellipses where text was dropped.
fn snippet_around(text: &str, match_start: usize, match_len: usize) -> String {
    // Walk back/forward by characters, not bytes, so multi-byte text
    // never splits mid-character.
    let start = {
        let mut boundary = match_start;
        let mut remaining = SNIPPET_CONTEXT;
        while remaining > 0 && boundary > 0 {
            boundary = floor_char_boundary(text, boundary - 1);
            remaining -= 1;
        }
        boundary
    };

    let end = {
        let mut boundary = (match_start + match_len).min(text.len());
        boundary = ceil_char_boundary(text, boundary);
        let mut remaining = SNIPPET_CONTEXT;
        while remaining > 0 && boundary < text.len() {
            boundary = ceil_char_boundary(text, boundary + 1);
            remaining -= 1;
        }
        boundary
    };

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&text[start..end]);
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

/// Largest char boundary `<= index`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= index`.
fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
