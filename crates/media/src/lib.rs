//! RTP packet codec and telephony audio transcoding
//!
//! The media layer is pure data transformation: no sockets, no tasks.
//! `rtp` parses and serializes RTP packets, `mulaw` converts between
//! companded 8-bit telephony audio and 16-bit linear PCM, `resample`
//! changes sample rates, and `transcode` chains them for the two
//! directions of a call.

pub mod mulaw;
pub mod resample;
pub mod rtp;
pub mod transcode;

use thiserror::Error;

/// Media layer errors
///
/// Both variants are recoverable at the call level: the offending packet
/// or frame is dropped and processing continues.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("malformed RTP packet: {0}")]
    MalformedPacket(String),

    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),
}

pub use rtp::{RtpExtension, RtpPacket};
