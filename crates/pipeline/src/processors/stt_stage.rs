//! Speech-to-text pipeline stage

use crate::interruption::InterruptionManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use voice_gateway_core::{
    AudioFrame, ControlFrame, Frame, FrameProcessor, ProcessorContext, Result, SpeechToText,
};

#[derive(Default)]
struct Capture {
    active: bool,
    samples: Vec<i16>,
    sample_rate: u32,
}

/// Buffers caller audio between speech boundaries and transcribes each
/// utterance when it closes.
///
/// Partial hypotheses are streamed to the interruption manager as they
/// arrive, so a barge-in can stop playback before the final transcript is
/// ready. Audio frames are consumed here; only markers and transcripts
/// continue downstream.
pub struct SttStage {
    stt: Arc<dyn SpeechToText>,
    manager: Arc<InterruptionManager>,
    capture: Mutex<Capture>,
}

impl SttStage {
    pub fn new(stt: Arc<dyn SpeechToText>, manager: Arc<InterruptionManager>) -> Self {
        Self {
            stt,
            manager,
            capture: Mutex::new(Capture::default()),
        }
    }

    async fn transcribe_utterance(&self, audio: AudioFrame, out: &mut Vec<Frame>) {
        let (partial_tx, mut partial_rx) = mpsc::channel(32);
        let transcribe = self.stt.transcribe(audio, partial_tx);
        let drain = async {
            let mut partials = Vec::new();
            while let Some(partial) = partial_rx.recv().await {
                self.manager.observe_transcript(&partial.text);
                partials.push(Frame::TranscriptPartial {
                    text: partial.text,
                    confidence: partial.confidence,
                });
            }
            partials
        };
        let (final_result, partials) = tokio::join!(transcribe, drain);
        out.extend(partials);

        match final_result {
            Ok(transcript) if transcript.text.trim().is_empty() => {
                debug!(backend = self.stt.name(), "empty transcript, dropping");
            }
            Ok(transcript) => {
                self.manager.observe_transcript(&transcript.text);
                out.push(Frame::TranscriptFinal {
                    text: transcript.text,
                });
            }
            Err(error) => {
                warn!(backend = self.stt.name(), %error, "transcription failed");
                out.push(Frame::Error {
                    stage: "stt".to_string(),
                    message: error.to_string(),
                    recoverable: true,
                });
            }
        }
    }
}

#[async_trait]
impl FrameProcessor for SttStage {
    async fn process(&self, frame: Frame, _context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::SpeechStart => {
                let mut capture = self.capture.lock();
                capture.active = true;
                capture.samples.clear();
                Ok(vec![Frame::SpeechStart])
            }
            Frame::AudioInput(audio) => {
                let mut capture = self.capture.lock();
                if capture.active {
                    capture.sample_rate = audio.sample_rate;
                    capture.samples.extend_from_slice(&audio.samples);
                }
                Ok(vec![])
            }
            Frame::SpeechEnd { duration_ms } => {
                let (samples, sample_rate) = {
                    let mut capture = self.capture.lock();
                    capture.active = false;
                    (std::mem::take(&mut capture.samples), capture.sample_rate)
                };
                let mut out = vec![Frame::SpeechEnd { duration_ms }];
                if !samples.is_empty() {
                    let audio = AudioFrame::new(samples, sample_rate);
                    self.transcribe_utterance(audio, &mut out).await;
                }
                Ok(out)
            }
            Frame::Control(ControlFrame::Reset) => {
                let mut capture = self.capture.lock();
                capture.active = false;
                capture.samples.clear();
                Ok(vec![Frame::Control(ControlFrame::Reset)])
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "stt"
    }
}
