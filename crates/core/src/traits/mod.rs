//! Core traits for pluggable components

mod pipeline;
mod speech;

pub use pipeline::{FrameProcessor, ProcessorContext};
pub use speech::{LanguageModel, SpeechToText, TextToSpeech, Transcript};
