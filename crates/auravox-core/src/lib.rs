#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod ports;
pub mod segment;
pub mod settings;
pub mod voices;

// Re-export key types for convenience
pub use ports::{
    AudioClip, NoopPositionStore, PositionStore, PositionStoreError, SpeechSynthesizer,
    SynthesisError,
};
pub use segment::{SearchHit, Segment, SegmentStore};
pub use settings::{MAX_SPEED, MIN_SPEED, ReaderSettings};
pub use voices::{VoiceCatalog, VoiceGender, VoiceInfo};
