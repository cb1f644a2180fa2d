//! Reader settings.

use serde::{Deserialize, Serialize};

use crate::voices::VoiceCatalog;

/// Slowest supported playback speed multiplier.
pub const MIN_SPEED: f32 = 0.25;

/// Fastest supported playback speed multiplier.
pub const MAX_SPEED: f32 = 2.0;

/// User-facing reader settings that affect the audio pipeline.
///
/// Presentation settings (fonts, themes, ambience) belong to the UI layer
/// and are deliberately not modelled here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSettings {
    /// Active voice id (see [`VoiceCatalog`]).
    pub voice: String,

    /// Playback speed multiplier, clamped to [`MIN_SPEED`]..=[`MAX_SPEED`].
    pub speed: f32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            voice: VoiceCatalog::default_voice().id,
            speed: 1.0,
        }
    }
}

impl ReaderSettings {
    /// Return a copy with the speed clamped into the supported range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
        self
    }
}
