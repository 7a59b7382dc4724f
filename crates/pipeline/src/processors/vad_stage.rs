//! VAD pipeline stage

use crate::interruption::InterruptionManager;
use crate::vad::{VadEngine, VadEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use voice_gateway_core::{ControlFrame, Frame, FrameProcessor, ProcessorContext, Result};

/// Runs the VAD over inbound audio and turns state transitions into
/// speech boundary frames.
///
/// Audio is always forwarded unchanged; this stage only adds markers. It
/// also feeds every audio frame to the interruption manager, which needs
/// the raw signal for its volume strategy.
pub struct VadStage {
    vad: Mutex<VadEngine>,
    manager: Arc<InterruptionManager>,
}

impl VadStage {
    pub fn new(vad: VadEngine, manager: Arc<InterruptionManager>) -> Self {
        Self {
            vad: Mutex::new(vad),
            manager,
        }
    }
}

#[async_trait]
impl FrameProcessor for VadStage {
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::AudioInput(audio) => {
                self.manager.observe_audio(&audio);
                let bot_speaking = self.manager.snapshot().bot_speaking;
                let event = self.vad.lock().process_frame(&audio, bot_speaking);

                let mut out = vec![Frame::AudioInput(audio)];
                match event {
                    Some(VadEvent::UserStartedSpeaking { barge_in }) => {
                        debug!(call_id = %context.call_id, barge_in, "caller speech confirmed");
                        self.manager.on_user_speech_start();
                        if barge_in {
                            out.push(Frame::BargeIn);
                        }
                        out.push(Frame::SpeechStart);
                    }
                    Some(VadEvent::UserStoppedSpeaking { duration_ms }) => {
                        debug!(call_id = %context.call_id, duration_ms, "caller speech ended");
                        self.manager.on_user_speech_end();
                        out.push(Frame::SpeechEnd { duration_ms });
                    }
                    None => {}
                }
                Ok(out)
            }
            Frame::Control(ControlFrame::Reset) => {
                self.vad.lock().reset();
                Ok(vec![Frame::Control(ControlFrame::Reset)])
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "vad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_config::{InterruptionConfig, VadConfig};
    use voice_gateway_core::AudioFrame;

    fn stage() -> VadStage {
        let manager = Arc::new(InterruptionManager::new(&InterruptionConfig::default()));
        let vad = VadEngine::with_energy_classifier(&VadConfig::default(), 20);
        VadStage::new(vad, manager)
    }

    fn speech_audio() -> Frame {
        Frame::AudioInput(AudioFrame::new(vec![4000i16; 320], 16000))
    }

    #[tokio::test]
    async fn marks_speech_start_after_threshold() {
        let stage = stage();
        let mut ctx = ProcessorContext::new("call-1");

        for _ in 0..2 {
            let out = stage.process(speech_audio(), &mut ctx).await.unwrap();
            assert_eq!(out.len(), 1, "audio only before confirmation");
        }
        let out = stage.process(speech_audio(), &mut ctx).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Frame::AudioInput(_)));
        assert!(matches!(out[1], Frame::SpeechStart));
    }

    #[tokio::test]
    async fn barge_in_frame_precedes_speech_start() {
        let stage = stage();
        stage.manager.set_bot_speaking(true);
        let mut ctx = ProcessorContext::new("call-1");

        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.extend(stage.process(speech_audio(), &mut ctx).await.unwrap());
        }
        let kinds: Vec<_> = frames.iter().map(Frame::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "audio_input",
                "audio_input",
                "audio_input",
                "barge_in",
                "speech_start"
            ]
        );
    }
}
