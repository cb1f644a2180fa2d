#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod cache;
pub mod error;
pub mod fetch;
pub mod session;
pub mod stats;

pub use cache::{AudioCache, AudioHandle, ReadingContext};
pub use error::ReaderError;
pub use fetch::FetchCoordinator;
pub use session::{
    LoadingHint, OpenDocument, ReaderConfig, ReaderEvent, ReaderSession, VisibleState,
};
pub use stats::{ReadingStats, WORDS_PER_MINUTE, reading_stats};

// Dev-dependencies exercised only from tests/.
#[cfg(test)]
mod dev_deps {
    use async_trait as _;
    use mockall as _;
    use tokio_test as _;
}
