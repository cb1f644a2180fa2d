//! Speech synthesis port.
//!
//! The audio pipeline treats synthesis as an opaque remote operation with
//! one success shape ([`AudioClip`]) and one failure shape
//! ([`SynthesisError`]). It never interprets the audio format beyond
//! handing the bytes to a player.

use std::time::Duration;

use async_trait::async_trait;

// ── Audio clip ─────────────────────────────────────────────────────

/// Audio produced by one synthesis call.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Complete playable audio container (WAV for the Gemini adapter).
    pub bytes: Vec<u8>,

    /// Sample rate of the audio (e.g. 24 000 Hz).
    pub sample_rate: u32,

    /// Playback duration.
    pub duration: Duration,
}

// ── Error ──────────────────────────────────────────────────────────

/// Errors returned by [`SpeechSynthesizer::synthesize`].
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// No API credentials are configured.
    #[error("Synthesis credentials missing — set the API key first")]
    MissingCredentials,

    /// The text was empty (or too short) after sanitization. The pipeline
    /// treats this as "nothing to say", not as a failure.
    #[error("Text is empty or too short after sanitization")]
    EmptyInput,

    /// The upstream service refused to generate audio for this text.
    #[error("Generation blocked upstream: {0}")]
    Blocked(String),

    /// The upstream response carried no audio payload.
    #[error("No audio data received from the synthesis service")]
    MissingAudio,

    /// Transport-level failure (connection, TLS, non-success status).
    #[error("Synthesis request failed: {0}")]
    Network(String),
}

// ── Port trait ─────────────────────────────────────────────────────

/// Port trait for the remote text-to-speech operation.
///
/// Implemented by `GeminiSynthesizer` in `auravox-gemini`.
/// Consumed by the fetch coordinator in `auravox-audio`.
///
/// Implementations must be `Send + Sync`; the pipeline invokes them from
/// concurrently spawned prefetch tasks behind an `Arc`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice.
    ///
    /// This is the pipeline's single suspension point: everything else in
    /// the fetch path is non-blocking bookkeeping.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError>;
}
