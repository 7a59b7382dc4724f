//! Process-wide call manager

use crate::call::{CallCodec, CallCounters, CallSession, CallTasks};
use crate::ports::PortAllocator;
use crate::{rtp_io, TelephonyError};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use voice_gateway_config::constants::telephony::TEARDOWN_TIMEOUT_MS;
use voice_gateway_config::{MediaConfig, PipelineConfig, Settings};
use voice_gateway_core::{Frame, LifecyclePhase};
use voice_gateway_media::rtp::random_ssrc;
use voice_gateway_pipeline::{build_pipeline, PipelineBackends};

/// The media half of an SDP answer: where the caller should send RTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallAnswer {
    pub local_ip: IpAddr,
    pub local_port: u16,
}

impl CallAnswer {
    fn for_session(session: &CallSession) -> Self {
        Self {
            local_ip: session.local_addr.ip(),
            local_port: session.local_addr.port(),
        }
    }
}

/// Creates and tears down calls.
///
/// The registry and the port allocator are the only state shared across
/// calls; everything else lives inside each call's session and tasks.
/// `create_call` is idempotent per call id so a retried signaling request
/// gets the original answer instead of a second media session.
pub struct CallManager {
    media: MediaConfig,
    pipeline: PipelineConfig,
    fallback_utterance: String,
    backends: PipelineBackends,
    ports: PortAllocator,
    calls: DashMap<String, Arc<CallSession>>,
}

impl CallManager {
    pub fn new(settings: &Settings, backends: PipelineBackends) -> Self {
        Self {
            media: settings.media.clone(),
            pipeline: settings.pipeline.clone(),
            fallback_utterance: settings.backends.fallback_utterance.clone(),
            backends,
            ports: PortAllocator::new(settings.media.port_min, settings.media.port_max),
            calls: DashMap::new(),
        }
    }

    /// Set up a call and answer with the local RTP endpoint.
    ///
    /// A duplicate call id returns the existing session's answer. Setup as
    /// a whole runs under the configured timeout; on expiry the partially
    /// built call is discarded and its port released.
    pub async fn create_call(
        &self,
        call_id: &str,
        remote_addr: SocketAddr,
        codec: CallCodec,
    ) -> Result<CallAnswer, TelephonyError> {
        if let Some(existing) = self.calls.get(call_id) {
            debug!(call_id, "duplicate create, returning existing answer");
            return Ok(CallAnswer::for_session(&existing));
        }

        let port = self.ports.allocate()?;
        let setup_ms = self.pipeline.call_setup_timeout_ms;
        let session = match timeout(
            Duration::from_millis(setup_ms),
            self.setup(call_id, remote_addr, codec, port),
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err(error)) => {
                self.ports.release(port);
                return Err(error);
            }
            Err(_) => {
                self.ports.release(port);
                warn!(call_id, setup_ms, "call setup timed out");
                return Err(TelephonyError::CallSetupTimeout(setup_ms));
            }
        };

        match self.calls.entry(call_id.to_string()) {
            Entry::Occupied(entry) => {
                // a concurrent create for the same id won; keep its session
                let winner = entry.get().clone();
                drop(entry);
                debug!(call_id, "lost create race, discarding duplicate session");
                self.teardown(&session).await;
                self.ports.release(port);
                Ok(CallAnswer::for_session(&winner))
            }
            Entry::Vacant(slot) => {
                let answer = CallAnswer::for_session(&session);
                slot.insert(session);
                info!(call_id, port, codec = ?codec, "call created");
                Ok(answer)
            }
        }
    }

    /// Tear down a call, draining its pipeline and freeing its port
    pub async fn terminate_call(&self, call_id: &str) -> Result<(), TelephonyError> {
        let (_, session) = self
            .calls
            .remove(call_id)
            .ok_or_else(|| TelephonyError::SessionNotFound(call_id.to_string()))?;
        let port = session.local_addr.port();
        self.teardown(&session).await;
        self.ports.release(port);
        info!(call_id, "call terminated");
        Ok(())
    }

    /// Observability snapshot for one call
    pub fn call_snapshot(&self, call_id: &str) -> Result<crate::CallSnapshot, TelephonyError> {
        self.calls
            .get(call_id)
            .map(|session| session.snapshot())
            .ok_or_else(|| TelephonyError::SessionNotFound(call_id.to_string()))
    }

    pub fn active_calls(&self) -> usize {
        self.calls.len()
    }

    /// Terminate every active call, for process shutdown
    pub async fn terminate_all(&self) {
        let ids: Vec<String> = self.calls.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let _ = self.terminate_call(&id).await;
        }
    }

    async fn setup(
        &self,
        call_id: &str,
        remote_addr: SocketAddr,
        codec: CallCodec,
        port: u16,
    ) -> Result<Arc<CallSession>, TelephonyError> {
        let bind_ip: IpAddr = self
            .media
            .rtp_ip
            .parse()
            .map_err(|_| TelephonyError::Config(format!("invalid rtp_ip {:?}", self.media.rtp_ip)))?;
        let socket = Arc::new(UdpSocket::bind((bind_ip, port)).await?);
        let local_addr = socket.local_addr()?;

        let (audio_tx, audio_rx) = mpsc::channel(self.pipeline.channel_capacity);
        let handles = build_pipeline(
            call_id,
            &self.pipeline,
            self.fallback_utterance.clone(),
            PipelineBackends {
                stt: self.backends.stt.clone(),
                llm: self.backends.llm.clone(),
                tts: self.backends.tts.clone(),
            },
            audio_tx,
        );
        handles
            .input
            .send(Frame::Lifecycle(LifecyclePhase::Start))
            .await
            .map_err(|_| TelephonyError::Pipeline("pipeline rejected start".to_string()))?;

        let counters = Arc::new(CallCounters::default());
        let ssrc = random_ssrc();
        let receive = tokio::spawn(rtp_io::receive_loop(
            socket.clone(),
            handles.input.clone(),
            codec,
            self.pipeline.sample_rate,
            counters.clone(),
        ));
        let egress = tokio::spawn(rtp_io::egress_loop(
            socket,
            remote_addr,
            audio_rx,
            handles.manager.subscribe_stop(),
            codec,
            self.media.payload_type,
            ssrc,
            self.pipeline.frame_ms,
            counters.clone(),
        ));
        let mut events = handles.events;
        let event_call_id = call_id.to_string();
        let events_task = tokio::spawn(async move {
            while let Some(frame) = events.recv().await {
                match frame {
                    Frame::Error {
                        stage,
                        message,
                        recoverable,
                    } => warn!(call_id = %event_call_id, %stage, %message, recoverable, "pipeline error"),
                    other => trace!(call_id = %event_call_id, kind = other.kind(), "pipeline event"),
                }
            }
        });

        Ok(Arc::new(CallSession {
            call_id: call_id.to_string(),
            local_addr,
            remote_addr,
            codec,
            ssrc,
            input: handles.input,
            interruption: handles.manager,
            conversation: handles.conversation,
            counters,
            tasks: Mutex::new(Some(CallTasks {
                receive,
                egress,
                events: events_task,
            })),
            started_at: Utc::now(),
            started_instant: Instant::now(),
        }))
    }

    async fn teardown(&self, session: &CallSession) {
        let deadline = Duration::from_millis(TEARDOWN_TIMEOUT_MS);
        if timeout(
            deadline,
            session.input.send(Frame::Lifecycle(LifecyclePhase::End)),
        )
        .await
        .is_err()
        {
            warn!(call_id = %session.call_id, "pipeline would not accept shutdown frame");
        }

        let Some(tasks) = session.tasks.lock().take() else {
            return;
        };
        tasks.receive.abort();

        let mut events = tasks.events;
        if timeout(deadline, &mut events).await.is_err() {
            warn!(call_id = %session.call_id, "pipeline drain timed out, aborting");
            events.abort();
        }
        let mut egress = tasks.egress;
        if timeout(deadline, &mut egress).await.is_err() {
            warn!(call_id = %session.call_id, "egress drain timed out, aborting");
            egress.abort();
        }
    }
}
