//! Centralized constants for the voice gateway
//!
//! Single source of truth for telephony and audio constants used across
//! the codebase. Use these instead of hardcoding values in multiple files.

/// Audio framing and sample-rate constants
pub mod audio {
    /// Frame duration used throughout the media path (milliseconds)
    pub const FRAME_MS: u32 = 20;

    /// Telephony sample rate (Hz)
    pub const TELEPHONY_RATE: u32 = 8000;

    /// Default pipeline sample rate for STT/TTS (Hz)
    pub const PIPELINE_RATE: u32 = 16000;

    /// Samples per 20ms frame at the telephony rate
    pub const TELEPHONY_FRAME_SAMPLES: usize =
        (TELEPHONY_RATE as usize * FRAME_MS as usize) / 1000;

    /// Energy classifier: amplitude above which a sample counts as active
    pub const SPEECH_AMPLITUDE_THRESHOLD: i16 = 500;

    /// Energy classifier: fraction of active samples that marks a speech frame
    pub const SPEECH_SAMPLE_RATIO: f32 = 0.1;
}

/// μ-law companding constants (G.711 style, toll quality)
pub mod mulaw {
    /// Bias added to magnitude before segment search
    pub const BIAS: i32 = 0x84;

    /// Peak clipping limit for linear input
    pub const CLIP: i32 = 32635;
}

/// RTP protocol constants
pub mod rtp {
    /// Fixed RTP header length in bytes (without CSRC/extension)
    pub const HEADER_LEN: usize = 12;

    /// RTP protocol version
    pub const VERSION: u8 = 2;

    /// Static payload type for PCMU (companded 8kHz)
    pub const PAYLOAD_TYPE_PCMU: u8 = 0;
}

/// Voice activity detection defaults
pub mod vad {
    /// Consecutive speech frames before speech is confirmed
    pub const SPEECH_THRESHOLD_FRAMES: u32 = 3;

    /// Consecutive silence frames before an utterance is closed
    pub const SILENCE_THRESHOLD_FRAMES: u32 = 25;

    /// Silent frames from Speaking/BargeIn before entering PossibleEnd
    pub const POSSIBLE_END_FRAMES: u32 = 2;
}

/// Barge-in / interruption defaults
pub mod interruption {
    /// Minimum accumulated words for the word-count strategy
    pub const MIN_WORDS: usize = 2;

    /// Normalized RMS above which the volume strategy starts its timer
    pub const VOLUME_THRESHOLD: f32 = 0.12;

    /// Sustained loud duration before the volume strategy triggers (ms)
    pub const VOLUME_MIN_DURATION_MS: u64 = 400;

    /// Audio gap after which the volume timer resets (ms)
    pub const VOLUME_STALE_MS: u64 = 1000;
}

/// Telephony/session defaults
pub mod telephony {
    /// Default first RTP port
    pub const PORT_MIN: u16 = 10000;

    /// Default last RTP port (inclusive)
    pub const PORT_MAX: u16 = 10999;

    /// Call setup must reach steady state within this window (ms)
    pub const CALL_SETUP_TIMEOUT_MS: u64 = 3000;

    /// Bounded wait for pipeline shutdown on teardown (ms)
    pub const TEARDOWN_TIMEOUT_MS: u64 = 2000;
}
