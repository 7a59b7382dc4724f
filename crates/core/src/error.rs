//! Error types shared across pipeline stages and backend adapters

use thiserror::Error;

/// Errors produced inside a call's pipeline or by backend adapters.
///
/// Protocol/format errors (`InvalidAudioFormat`) are recovered locally by
/// dropping the offending frame. Backend errors are retried with backoff
/// and eventually degraded to a fallback utterance. No variant here should
/// ever terminate a call on its own.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
