//! Gemini `generateContent` client for text-to-speech.
//!
//! One request per segment: the text goes in as a single user part with
//! `responseModalities: ["AUDIO"]`, and the answer carries base64 PCM16
//! in `inlineData`. Everything that can go wrong maps onto
//! [`SynthesisError`]; the pipeline decides what failures mean.

use std::time::Duration;

use async_trait::async_trait;
use auravox_core::{AudioClip, SpeechSynthesizer, SynthesisError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::voices::prebuilt_voice_name;
use crate::wav;

/// Gemini model used for speech generation.
pub const GEMINI_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Environment variable consulted by [`GeminiSynthesizer::from_env`].
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Sample rate of the PCM Gemini returns.
const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Minimum sanitized length worth sending upstream.
const MIN_SPEAKABLE_CHARS: usize = 2;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSpeechRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateSpeechResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

// ── Client ─────────────────────────────────────────────────────────

/// [`SpeechSynthesizer`] implementation backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiSynthesizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key never goes into logs.
        f.debug_struct("GeminiSynthesizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiSynthesizer {
    /// Create a client with an explicit API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: GEMINI_TTS_MODEL.to_string(),
        }
    }

    /// Create a client from the [`API_KEY_ENV`] environment variable.
    pub fn from_env() -> Result<Self, SynthesisError> {
        Self::from_key(std::env::var(API_KEY_ENV).ok())
    }

    fn from_key(api_key: Option<String>) -> Result<Self, SynthesisError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(SynthesisError::MissingCredentials)?;
        Ok(Self::new(api_key))
    }

    /// Override the model (e.g. to pin a newer TTS preview).
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError> {
        let clean = sanitize(text).ok_or(SynthesisError::EmptyInput)?;
        let voice_name = prebuilt_voice_name(voice_id);
        debug!(
            voice_id,
            voice_name,
            chars = clean.chars().count(),
            "requesting speech generation"
        );

        let request = GenerateSpeechRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: clean }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name.to_string(),
                        },
                    },
                },
            },
        };

        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| SynthesisError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SynthesisError::Network(err.to_string()))?;
        if !status.is_success() {
            warn!(%status, "speech generation request rejected");
            return Err(SynthesisError::Network(format!(
                "HTTP {status}: {}",
                truncate(&body, 200)
            )));
        }

        let pcm = decode_audio_payload(&body)?;
        let duration = wav::pcm16_duration(pcm.len(), OUTPUT_SAMPLE_RATE, 1);
        Ok(AudioClip {
            bytes: wav::pcm16_to_wav(&pcm, OUTPUT_SAMPLE_RATE, 1),
            sample_rate: OUTPUT_SAMPLE_RATE,
            duration,
        })
    }
}

// ── Response handling ──────────────────────────────────────────────

/// Pull the raw PCM out of a successful `generateContent` response body.
fn decode_audio_payload(body: &str) -> Result<Vec<u8>, SynthesisError> {
    let parsed: GenerateSpeechResponse = serde_json::from_str(body)
        .map_err(|err| SynthesisError::Network(format!("malformed response: {err}")))?;

    let Some(candidate) = parsed.candidates.first() else {
        return Err(SynthesisError::MissingAudio);
    };

    let data = candidate
        .content
        .as_ref()
        .and_then(|content| {
            content
                .parts
                .iter()
                .find_map(|part| part.inline_data.as_ref())
        })
        .map(|inline| inline.data.as_str());

    let Some(data) = data else {
        // No audio: a finish reason other than STOP explains why.
        return match candidate.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => {
                warn!(reason, "generation stopped without audio");
                Err(SynthesisError::Blocked(reason.to_string()))
            }
            _ => Err(SynthesisError::MissingAudio),
        };
    };

    BASE64
        .decode(data)
        .map_err(|err| SynthesisError::Network(format!("audio payload not valid base64: {err}")))
}

/// Replace control characters with spaces and require a minimum of
/// speakable text, mirroring what the pipeline considers "silence".
fn sanitize(text: &str) -> Option<String> {
    let clean: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let clean = clean.trim().to_string();
    (clean.chars().count() >= MIN_SPEAKABLE_CHARS).then_some(clean)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
