//! Audio frame types and utilities

use std::sync::Arc;
use std::time::Duration;

/// Audio frame of 16-bit signed linear PCM samples with metadata.
///
/// Samples are stored as `Arc<[i16]>` so frames can be cloned cheaply as
/// they pass between pipeline stages. The wire formats on both sides of
/// the gateway (RTP payloads and backend service streams) are byte
/// oriented; `from_pcm16`/`to_pcm16` convert at those boundaries.
#[derive(Clone, PartialEq)]
pub struct AudioFrame {
    /// Linear PCM samples (interleaved if multi-channel)
    pub samples: Arc<[i16]>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (telephony audio is mono)
    pub channels: u16,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

impl AudioFrame {
    /// Create a new mono audio frame from raw samples
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: 1,
        }
    }

    /// Decode little-endian PCM16 bytes into a frame.
    ///
    /// Returns `None` for odd-length input; the caller decides whether
    /// that is a dropped frame or a hard error.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32) -> Option<Self> {
        if bytes.len() % 2 != 0 {
            return None;
        }
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        Some(Self::new(samples, sample_rate))
    }

    /// Encode samples as little-endian PCM16 bytes
    pub fn to_pcm16(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|&sample| sample.to_le_bytes())
            .collect()
    }

    /// Number of samples in this frame
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check whether the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of this frame
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(
            self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64),
        )
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Root-mean-square amplitude normalized to [0.0, 1.0]
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let v = s as f64 / i16::MAX as f64;
                v * v
            })
            .sum();
        (sum_squares / self.samples.len() as f64).sqrt() as f32
    }

    /// Count of samples whose magnitude exceeds `threshold`
    pub fn samples_above(&self, threshold: i16) -> usize {
        let threshold = threshold.unsigned_abs();
        self.samples
            .iter()
            .filter(|s| s.unsigned_abs() > threshold)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_round_trip() {
        let frame = AudioFrame::new(vec![0, 1000, -1000, i16::MAX, i16::MIN], 8000);
        let bytes = frame.to_pcm16();
        let back = AudioFrame::from_pcm16(&bytes, 8000).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn odd_length_pcm16_rejected() {
        assert!(AudioFrame::from_pcm16(&[0x00, 0x01, 0x02], 8000).is_none());
    }

    #[test]
    fn duration_of_20ms_frame() {
        // 160 samples at 8kHz = 20ms
        let frame = AudioFrame::new(vec![0; 160], 8000);
        assert_eq!(frame.duration_ms(), 20);
    }

    #[test]
    fn rms_silence_and_full_scale() {
        let silent = AudioFrame::new(vec![0; 160], 8000);
        assert_eq!(silent.rms(), 0.0);

        let loud = AudioFrame::new(vec![i16::MAX; 160], 8000);
        assert!(loud.rms() > 0.99);
    }

    #[test]
    fn samples_above_counts_magnitude() {
        let frame = AudioFrame::new(vec![0, 500, -600, 100], 8000);
        assert_eq!(frame.samples_above(400), 2);
    }
}
