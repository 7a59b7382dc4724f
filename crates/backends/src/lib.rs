//! HTTP adapters for the backend AI services
//!
//! Each backend (speech-to-text, language model, text-to-speech) is an
//! independent HTTP service that streams results as it produces them:
//! NDJSON lines for text, raw PCM for audio. The adapters implement the
//! core traits, retry transient failures with doubling backoff, and map
//! everything that remains broken to `Error::BackendUnavailable` so the
//! pipeline can degrade instead of crashing the call.

mod http;
pub mod llm;
pub mod stt;
pub mod tts;

pub use llm::HttpLanguageModel;
pub use stt::HttpSpeechToText;
pub use tts::HttpTextToSpeech;
