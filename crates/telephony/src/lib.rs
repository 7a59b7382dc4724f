//! Telephony side of the gateway
//!
//! Owns everything between the wire and a call's pipeline: UDP sockets
//! and the RTP receive/egress loops, the port allocator, per-call
//! sessions, and the process-wide call manager. One task set per call;
//! the registry and the port allocator are the only cross-call state.

pub mod call;
pub mod manager;
pub mod ports;
pub mod rtp_io;

use thiserror::Error;
use voice_gateway_media::MediaError;

/// Telephony layer errors
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("call setup timed out after {0} ms")]
    CallSetupTimeout(u64),

    #[error("no RTP ports available in the configured range")]
    ResourceExhausted,

    #[error("no such call: {0}")]
    SessionNotFound(String),

    #[error("invalid media configuration: {0}")]
    Config(String),

    #[error("pipeline failed: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

pub use call::{CallCodec, CallCounters, CallSession, CallSnapshot};
pub use manager::{CallAnswer, CallManager};
pub use ports::PortAllocator;
