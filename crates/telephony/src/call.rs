//! Per-call session state

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voice_gateway_core::Frame;
use voice_gateway_pipeline::InterruptionManager;

/// Negotiated media codec for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallCodec {
    /// G.711 μ-law at 8 kHz (RTP payload type 0)
    #[default]
    Pcmu,
    /// Uncompressed big-endian 16-bit linear at 16 kHz
    L16,
}

impl CallCodec {
    /// Sample rate of the wire format
    pub fn wire_rate(&self) -> u32 {
        match self {
            CallCodec::Pcmu => 8000,
            CallCodec::L16 => 16000,
        }
    }
}

/// Packet counters shared between the media loops and stats readers
#[derive(Debug, Default)]
pub struct CallCounters {
    pub packets_received: AtomicU64,
    pub packets_sent: AtomicU64,
    pub malformed_dropped: AtomicU64,
}

/// Background tasks owned by a call, taken once at teardown
pub(crate) struct CallTasks {
    pub receive: JoinHandle<()>,
    pub egress: JoinHandle<()>,
    pub events: JoinHandle<()>,
}

/// One active call.
///
/// Everything mutable is either owned by the call's tasks or behind the
/// interruption manager's own lock; the session itself is shared
/// immutably out of the registry.
pub struct CallSession {
    pub call_id: String,
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    pub codec: CallCodec,
    pub ssrc: u32,
    pub(crate) input: mpsc::Sender<Frame>,
    pub(crate) interruption: Arc<InterruptionManager>,
    pub(crate) conversation: Arc<Mutex<voice_gateway_core::ConversationContext>>,
    pub(crate) counters: Arc<CallCounters>,
    pub(crate) tasks: Mutex<Option<CallTasks>>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) started_instant: Instant,
}

/// Observability snapshot of one call
#[derive(Debug, Clone, Serialize)]
pub struct CallSnapshot {
    pub call_id: String,
    pub remote_addr: SocketAddr,
    pub codec: CallCodec,
    pub started_at: DateTime<Utc>,
    pub uptime_ms: u64,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub malformed_dropped: u64,
    pub bot_speaking: bool,
    pub user_speaking: bool,
    pub interruption_active: bool,
    pub playback_stops: u64,
    pub conversation_turns: usize,
}

impl CallSession {
    pub fn snapshot(&self) -> CallSnapshot {
        let interruption = self.interruption.snapshot();
        CallSnapshot {
            call_id: self.call_id.clone(),
            remote_addr: self.remote_addr,
            codec: self.codec,
            started_at: self.started_at,
            uptime_ms: self.started_instant.elapsed().as_millis() as u64,
            packets_received: self.counters.packets_received.load(Ordering::Relaxed),
            packets_sent: self.counters.packets_sent.load(Ordering::Relaxed),
            malformed_dropped: self.counters.malformed_dropped.load(Ordering::Relaxed),
            bot_speaking: interruption.bot_speaking,
            user_speaking: interruption.user_speaking,
            interruption_active: interruption.interruption_active,
            playback_stops: interruption.stop_count,
            conversation_turns: self.conversation.lock().turn_count(),
        }
    }
}
