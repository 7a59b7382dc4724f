//! Frame types that flow through per-call pipelines
//!
//! Frames flow strictly in one direction through the ordered stage list.
//! A stage may drop, transform, or forward a frame but must not reorder
//! frames relative to one another.

use crate::audio::AudioFrame;
use serde::{Deserialize, Serialize};

/// Lifecycle phase markers pushed at pipeline start and teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Pushed once before steady-state audio; must reach every stage
    Start,
    /// Pushed on teardown; each stage releases resources as it passes
    End,
}

/// Control frames for pipeline management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlFrame {
    /// Flush pending state (e.g. force a final transcript)
    Flush,
    /// Reset stage-local state without tearing down
    Reset,
    /// Stop synthesized playback (barge-in was confirmed)
    StopPlayback,
}

/// A typed unit of data flowing through the pipeline
#[derive(Debug, Clone)]
pub enum Frame {
    /// Caller audio decoded from RTP, in pipeline PCM format
    AudioInput(AudioFrame),

    /// Partial transcript, still subject to revision
    TranscriptPartial { text: String, confidence: f32 },

    /// Final transcript for one utterance
    TranscriptFinal { text: String },

    /// Complete reply text ready for synthesis
    SynthesisText { text: String },

    /// Synthesized audio headed for the RTP egress
    AudioOutput(AudioFrame),

    /// VAD confirmed the caller started speaking
    SpeechStart,

    /// VAD confirmed the caller stopped speaking
    SpeechEnd {
        /// Duration of the speech segment in milliseconds
        duration_ms: u64,
    },

    /// Caller speech confirmed while the agent was playing audio
    BargeIn,

    /// Pipeline lifecycle marker
    Lifecycle(LifecyclePhase),

    /// Error recovered inside a stage; informational only
    Error {
        stage: String,
        message: String,
        recoverable: bool,
    },

    /// Control frame for pipeline management
    Control(ControlFrame),
}

impl Frame {
    /// Check if this is the teardown marker
    pub fn is_end(&self) -> bool {
        matches!(self, Frame::Lifecycle(LifecyclePhase::End))
    }

    /// Check if this is an error frame
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error { .. })
    }

    /// Short name for tracing
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::AudioInput(_) => "audio_input",
            Frame::TranscriptPartial { .. } => "transcript_partial",
            Frame::TranscriptFinal { .. } => "transcript_final",
            Frame::SynthesisText { .. } => "synthesis_text",
            Frame::AudioOutput(_) => "audio_output",
            Frame::SpeechStart => "speech_start",
            Frame::SpeechEnd { .. } => "speech_end",
            Frame::BargeIn => "barge_in",
            Frame::Lifecycle(LifecyclePhase::Start) => "lifecycle_start",
            Frame::Lifecycle(LifecyclePhase::End) => "lifecycle_end",
            Frame::Error { .. } => "error",
            Frame::Control(_) => "control",
        }
    }
}
