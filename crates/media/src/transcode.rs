//! Compound conversions between telephony and pipeline audio formats
//!
//! Inbound: companded 8kHz RTP payload → linear PCM at the pipeline rate.
//! Outbound: pipeline PCM → companded 8kHz for RTP egress. Byte-oriented
//! entry points validate that PCM buffers hold whole 16-bit samples;
//! malformed lengths fail with `InvalidAudioFormat` instead of silently
//! truncating.

use crate::{mulaw, resample, MediaError};
use voice_gateway_config::constants::audio::TELEPHONY_RATE;

/// Decode companded 8kHz bytes and resample to `target_rate`.
pub fn companded_to_rate(data: &[u8], target_rate: u32) -> Vec<i16> {
    let linear = mulaw::decode(data);
    resample::linear(&linear, TELEPHONY_RATE, target_rate)
}

/// Resample linear samples from `source_rate` to 8kHz and compand.
pub fn samples_to_companded(samples: &[i16], source_rate: u32) -> Vec<u8> {
    let telephony = resample::linear(samples, source_rate, TELEPHONY_RATE);
    mulaw::encode(&telephony)
}

/// Byte-oriented variant of [`samples_to_companded`].
///
/// `pcm` must be little-endian 16-bit samples; an odd byte count is
/// rejected.
pub fn rate_to_companded(pcm: &[u8], source_rate: u32) -> Result<Vec<u8>, MediaError> {
    if pcm.len() % 2 != 0 {
        return Err(MediaError::InvalidAudioFormat(format!(
            "PCM buffer of {} bytes is not a whole number of 16-bit samples",
            pcm.len()
        )));
    }
    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    Ok(samples_to_companded(&samples, source_rate))
}
