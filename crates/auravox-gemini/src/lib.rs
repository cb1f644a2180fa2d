#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod client;
pub mod voices;
pub mod wav;

pub use client::{API_KEY_ENV, GEMINI_TTS_MODEL, GeminiSynthesizer};
pub use voices::prebuilt_voice_name;
