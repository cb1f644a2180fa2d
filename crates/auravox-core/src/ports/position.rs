//! Reading-position persistence port.
//!
//! After every accepted navigation the session reports the new position
//! here fire-and-forget: a failed write must never stall or fail the
//! audio pipeline.

use async_trait::async_trait;

/// Errors returned by [`PositionStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum PositionStoreError {
    /// The backing store rejected or lost the write.
    #[error("Position store write failed: {0}")]
    Storage(String),
}

/// Port trait for durable reading-position and bookmark storage.
///
/// Implementations must be `Send + Sync`; the session calls them from
/// spawned fire-and-forget tasks.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Record that `document_id` is now being read at `index`.
    async fn save_position(&self, document_id: &str, index: usize)
    -> Result<(), PositionStoreError>;

    /// Replace the bookmark set for `document_id`.
    async fn save_bookmarks(
        &self,
        document_id: &str,
        bookmarks: &[usize],
    ) -> Result<(), PositionStoreError>;
}

/// A [`PositionStore`] that records nothing.
///
/// Useful for tests and for embedders that keep positions themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPositionStore;

#[async_trait]
impl PositionStore for NoopPositionStore {
    async fn save_position(
        &self,
        _document_id: &str,
        _index: usize,
    ) -> Result<(), PositionStoreError> {
        Ok(())
    }

    async fn save_bookmarks(
        &self,
        _document_id: &str,
        _bookmarks: &[usize],
    ) -> Result<(), PositionStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_store_accepts_everything() {
        let store = NoopPositionStore;
        store.save_position("doc", 3).await.unwrap();
        store.save_bookmarks("doc", &[1, 4]).await.unwrap();
    }
}
