//! Backend service traits: speech-to-text, language model, text-to-speech
//!
//! Each backend is an independent streaming service: submit audio/text,
//! receive a stream of partial results, signal end-of-input, and receive a
//! final flushed result. The wire transport is an implementation detail of
//! the adapter crate; the pipeline only depends on these traits.

use crate::{AudioFrame, Result, Turn};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A transcription result, partial or final
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
    pub confidence: f32,
}

impl Transcript {
    pub fn partial(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence,
        }
    }

    pub fn final_result(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }
}

/// Speech-to-Text interface
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe one utterance.
    ///
    /// Partial hypotheses are streamed to `partial_tx` as they arrive; the
    /// returned transcript is the final flush after end-of-input. A closed
    /// `partial_tx` is not an error; the caller may only want the final.
    async fn transcribe(
        &self,
        audio: AudioFrame,
        partial_tx: mpsc::Sender<Transcript>,
    ) -> Result<Transcript>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Language model interface
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a reply for the conversation so far.
    ///
    /// Text chunks are streamed to `chunk_tx` in generation order; the
    /// returned string is the complete reply after the stream finishes.
    async fn generate(&self, turns: &[Turn], chunk_tx: mpsc::Sender<String>) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Text-to-Speech interface
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text into PCM audio.
    ///
    /// Audio frames are streamed to `audio_tx` in playback order. Returns
    /// the total number of samples emitted once synthesis completes.
    async fn synthesize(&self, text: &str, audio_tx: mpsc::Sender<AudioFrame>) -> Result<usize>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
