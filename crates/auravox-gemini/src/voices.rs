//! Voice id mapping.
//!
//! The reader's voice catalog uses character ids; Gemini expects one of
//! its prebuilt voice names. Unknown ids pass through unchanged so a
//! caller can address a Gemini voice directly.

/// Gemini prebuilt voice name for an auravox voice id.
#[must_use]
pub fn prebuilt_voice_name(voice_id: &str) -> &str {
    match voice_id {
        "voice_pepe" => "Fenrir",
        "voice_fefe" => "Charon",
        "voice_carlito" => "Puck",
        "voice_margarita" | "voice_juana" => "Kore",
        "voice_anastasia" => "Zephyr",
        other => other,
    }
}
