//! μ-law companding for 8kHz telephony audio
//!
//! Toll-quality implementation: sign/magnitude with peak clipping, a bias
//! before the segment search, and bitwise inversion per μ-law convention.
//! Decode goes through a 256-entry table built on first use. This is not
//! bit-exact with the ITU-T STL reference; round trips are accurate to
//! within the μ-law quantization step, which is sufficient for
//! speech-bandwidth telephony.

use once_cell::sync::Lazy;
use voice_gateway_config::constants::mulaw::{BIAS, CLIP};

/// Compress one 16-bit linear sample to μ-law.
pub fn encode_sample(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign: u8 = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0
    };
    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    // Segment 0-7: position of the highest set bit above bit 7
    let mut segment = 7u32;
    let mut mask = 0x4000;
    while segment > 0 && magnitude & mask == 0 {
        segment -= 1;
        mask >>= 1;
    }

    let mantissa = ((magnitude >> (segment + 3)) & 0x0F) as u8;
    !(sign | ((segment as u8) << 4) | mantissa)
}

/// Expand one μ-law byte to a 16-bit linear sample.
pub fn decode_sample(byte: u8) -> i16 {
    let u = !byte;
    let segment = ((u >> 4) & 0x07) as u32;
    let mantissa = (u & 0x0F) as i32;
    let magnitude = ((BIAS << segment) - BIAS) + (mantissa << (segment + 3));
    if u & 0x80 != 0 {
        (-magnitude) as i16
    } else {
        magnitude as i16
    }
}

static DECODE_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (byte, entry) in table.iter_mut().enumerate() {
        *entry = decode_sample(byte as u8);
    }
    table
});

/// Decode companded bytes to linear PCM. Empty input yields empty output.
pub fn decode(data: &[u8]) -> Vec<i16> {
    data.iter().map(|&b| DECODE_TABLE[b as usize]).collect()
}

/// Encode linear PCM samples to companded bytes.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}
