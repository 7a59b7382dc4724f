//! Text-to-speech pipeline stage

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use voice_gateway_core::{
    ControlFrame, Frame, FrameProcessor, ProcessorContext, Result, TextToSpeech,
};

/// Synthesizes reply text into audio frames.
///
/// Frames are emitted in playback order, followed by a `Flush` marking the
/// end of the utterance; the output stage uses that marker to know when
/// agent playback for one reply is fully queued.
pub struct TtsStage {
    tts: Arc<dyn TextToSpeech>,
}

impl TtsStage {
    pub fn new(tts: Arc<dyn TextToSpeech>) -> Self {
        Self { tts }
    }
}

#[async_trait]
impl FrameProcessor for TtsStage {
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::SynthesisText { text } => {
                let (audio_tx, mut audio_rx) = mpsc::channel(32);
                let synthesize = self.tts.synthesize(&text, audio_tx);
                let drain = async {
                    let mut frames = Vec::new();
                    while let Some(audio) = audio_rx.recv().await {
                        frames.push(Frame::AudioOutput(audio));
                    }
                    frames
                };
                let (result, mut out) = tokio::join!(synthesize, drain);

                match result {
                    Ok(samples) => {
                        debug!(
                            call_id = %context.call_id,
                            backend = self.tts.name(),
                            samples,
                            "synthesis complete"
                        );
                        out.push(Frame::Control(ControlFrame::Flush));
                        Ok(out)
                    }
                    Err(error) => {
                        warn!(backend = self.tts.name(), %error, "synthesis failed");
                        // flush whatever was produced so playback state
                        // still closes out
                        out.push(Frame::Error {
                            stage: "tts".to_string(),
                            message: error.to_string(),
                            recoverable: true,
                        });
                        out.push(Frame::Control(ControlFrame::Flush));
                        Ok(out)
                    }
                }
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "tts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_core::AudioFrame;

    struct ToneTts {
        frames: usize,
    }

    #[async_trait]
    impl TextToSpeech for ToneTts {
        async fn synthesize(
            &self,
            _text: &str,
            audio_tx: mpsc::Sender<AudioFrame>,
        ) -> Result<usize> {
            for _ in 0..self.frames {
                let _ = audio_tx.send(AudioFrame::new(vec![1000i16; 320], 16000)).await;
            }
            Ok(self.frames * 320)
        }

        fn name(&self) -> &str {
            "tone"
        }
    }

    #[tokio::test]
    async fn synthesis_ends_with_flush() {
        let stage = TtsStage::new(Arc::new(ToneTts { frames: 3 }));
        let mut ctx = ProcessorContext::new("call-1");
        let out = stage
            .process(
                Frame::SynthesisText {
                    text: "hello caller".to_string(),
                },
                &mut ctx,
            )
            .await
            .unwrap();
        let kinds: Vec<_> = out.iter().map(Frame::kind).collect();
        assert_eq!(
            kinds,
            vec!["audio_output", "audio_output", "audio_output", "control"]
        );
        assert!(matches!(out.last(), Some(Frame::Control(ControlFrame::Flush))));
    }
}
