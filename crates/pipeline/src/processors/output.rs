//! Output pipeline stage

use crate::interruption::InterruptionManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use voice_gateway_core::{
    AudioFrame, ControlFrame, Error, Frame, FrameProcessor, LifecyclePhase, ProcessorContext,
    Result,
};

struct OutputState {
    stop_rx: watch::Receiver<u64>,
    last_stop: u64,
    suppressing: bool,
    playing: bool,
}

/// Terminal stage: pushes synthesized audio to the call's egress and
/// tracks whether the agent is audibly speaking.
///
/// When the interruption manager signals a stop, the remainder of the
/// current reply is discarded here frame by frame until the reply's
/// `Flush` marker passes; the egress clears its own queued audio off the
/// same watch channel. Frames this stage does not consume continue to the
/// chain's event receiver.
pub struct OutputStage {
    audio_tx: mpsc::Sender<AudioFrame>,
    manager: Arc<InterruptionManager>,
    state: Mutex<OutputState>,
}

impl OutputStage {
    pub fn new(audio_tx: mpsc::Sender<AudioFrame>, manager: Arc<InterruptionManager>) -> Self {
        let stop_rx = manager.subscribe_stop();
        let last_stop = *stop_rx.borrow();
        Self {
            audio_tx,
            manager,
            state: Mutex::new(OutputState {
                stop_rx,
                last_stop,
                suppressing: false,
                playing: false,
            }),
        }
    }

    /// Decide whether to forward one audio frame, updating playback state
    fn admit(&self) -> AdmitDecision {
        let mut state = self.state.lock();
        let stop = *state.stop_rx.borrow();
        if stop != state.last_stop {
            state.last_stop = stop;
            state.suppressing = true;
        }
        if state.suppressing {
            return AdmitDecision::Suppress;
        }
        if !state.playing {
            state.playing = true;
            return AdmitDecision::ForwardFirst;
        }
        AdmitDecision::Forward
    }
}

enum AdmitDecision {
    Forward,
    ForwardFirst,
    Suppress,
}

#[async_trait]
impl FrameProcessor for OutputStage {
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::AudioOutput(audio) => {
                match self.admit() {
                    AdmitDecision::Suppress => {
                        debug!(call_id = %context.call_id, "playback interrupted, dropping frame");
                        return Ok(vec![]);
                    }
                    AdmitDecision::ForwardFirst => self.manager.set_bot_speaking(true),
                    AdmitDecision::Forward => {}
                }
                self.audio_tx
                    .send(audio)
                    .await
                    .map_err(|_| Error::ChannelClosed("audio egress"))?;
                Ok(vec![])
            }
            Frame::Control(ControlFrame::Flush) => {
                let mut state = self.state.lock();
                state.suppressing = false;
                state.playing = false;
                drop(state);
                self.manager.set_bot_speaking(false);
                Ok(vec![])
            }
            Frame::Control(ControlFrame::StopPlayback) => {
                self.state.lock().suppressing = true;
                Ok(vec![])
            }
            Frame::Lifecycle(LifecyclePhase::End) => {
                self.manager.set_bot_speaking(false);
                Ok(vec![])
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "output"
    }
}
