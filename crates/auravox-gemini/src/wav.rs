//! PCM16 → WAV container.
//!
//! Gemini returns raw little-endian PCM16 samples with no container. A
//! 44-byte canonical WAV header in front is all a player needs.

use std::time::Duration;

const HEADER_LEN: u32 = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Wrap raw PCM16 samples in a WAV container.
#[must_use]
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
    let byte_rate = sample_rate * u32::from(channels) * u32::from(BITS_PER_SAMPLE / 8);
    let block_align = channels * (BITS_PER_SAMPLE / 8);

    let mut wav = Vec::with_capacity(HEADER_LEN as usize + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(HEADER_LEN - 8 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

/// Playback duration of a raw PCM16 buffer.
#[must_use]
pub fn pcm16_duration(pcm_len: usize, sample_rate: u32, channels: u16) -> Duration {
    let frame_bytes = usize::from(channels) * usize::from(BITS_PER_SAMPLE / 8);
    if sample_rate == 0 || frame_bytes == 0 {
        return Duration::ZERO;
    }
    let frames = pcm_len / frame_bytes;
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}
