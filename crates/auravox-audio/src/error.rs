//! Session-level errors.
//!
//! Synthesis failures are deliberately *not* here: the pipeline absorbs
//! them (logged, surfaced through `VisibleState` and events). Errors in
//! this module mean the caller asked for something impossible.

/// Errors returned by [`ReaderSession`](crate::session::ReaderSession)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// An operation that needs a document was called before one was
    /// opened.
    #[error("No document is open")]
    NoDocument,

    /// The requested segment index does not exist in the open document.
    #[error("Segment index {index} out of bounds (document has {len} segments)")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of segments in the open document.
        len: usize,
    },
}
