//! Core traits and types for the voice gateway
//!
//! This crate provides foundational types used across all other crates:
//! - Audio frame types and sample utilities
//! - The `Frame` enum that flows through per-call pipelines
//! - Core traits for pluggable backends (STT, LLM, TTS)
//! - The `FrameProcessor` trait implemented by pipeline stages
//! - Error types and conversation turns

pub mod audio;
pub mod conversation;
pub mod error;
pub mod frame;
pub mod traits;

pub use audio::AudioFrame;
pub use conversation::{ConversationContext, Turn, TurnRole};
pub use error::{Error, Result};
pub use frame::{ControlFrame, Frame, LifecyclePhase};
pub use traits::{
    FrameProcessor, LanguageModel, ProcessorContext, SpeechToText, TextToSpeech, Transcript,
};
