//! Curated voice catalog.
//!
//! The reader exposes a fixed set of named voices, each tuned to a reading
//! style. How a voice id maps onto a concrete synthesis backend is the
//! backend adapter's concern (see `auravox-gemini`), never this crate's.

use serde::{Deserialize, Serialize};

// ── Voice info ─────────────────────────────────────────────────────

/// Information about a single reader voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    /// Voice identifier used in API calls (e.g. `"voice_margarita"`).
    pub id: String,

    /// Human-readable display name.
    pub name: String,

    /// Reading style this voice is tuned for.
    pub style: String,

    /// Gender.
    pub gender: VoiceGender,
}

/// Voice gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceGender {
    Female,
    Male,
}

// ── Catalog ────────────────────────────────────────────────────────

/// The curated voice catalog.
///
/// Provides a fixed list of known-good voices with deterministic ids.
pub struct VoiceCatalog;

impl VoiceCatalog {
    /// All available voices.
    #[must_use]
    pub fn voices() -> Vec<VoiceInfo> {
        vec![
            voice_info("voice_pepe", "Pepe", "Científico", VoiceGender::Male),
            voice_info("voice_fefe", "Fefe", "Ensayo", VoiceGender::Male),
            voice_info("voice_carlito", "Carlito", "Aventura", VoiceGender::Male),
            voice_info("voice_margarita", "Margarita", "Narrativa", VoiceGender::Female),
            voice_info("voice_anastasia", "Anastasia", "Suave", VoiceGender::Female),
            voice_info("voice_juana", "Juana", "Informativa", VoiceGender::Female),
        ]
    }

    /// Look up a voice by id.
    #[must_use]
    pub fn find(voice_id: &str) -> Option<VoiceInfo> {
        Self::voices().into_iter().find(|v| v.id == voice_id)
    }

    /// The recommended default voice.
    #[must_use]
    pub fn default_voice() -> VoiceInfo {
        Self::find("voice_margarita").expect("default voice is always in the catalog")
    }
}

/// Convenience constructor for [`VoiceInfo`].
fn voice_info(id: &str, name: &str, style: &str, gender: VoiceGender) -> VoiceInfo {
    VoiceInfo {
        id: id.to_string(),
        name: name.to_string(),
        style: style.to_string(),
        gender,
    }
}
