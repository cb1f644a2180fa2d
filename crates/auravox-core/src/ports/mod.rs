//! Port definitions — trait seams between the pipeline and the outside world.
//!
//! # Design Rules
//!
//! - Ports describe *what* the pipeline needs, never *how* an adapter
//!   provides it. Adapter-specific conversion (HTTP shapes, SDK types)
//!   happens inside the adapter crate, never here.
//! - Every port is `Send + Sync` so the pipeline can hold it behind an
//!   `Arc<dyn …>` and call it from spawned prefetch tasks.

pub mod position;
pub mod synthesis;

pub use position::{NoopPositionStore, PositionStore, PositionStoreError};
pub use synthesis::{AudioClip, SpeechSynthesizer, SynthesisError};
