//! Language model pipeline stage

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use voice_gateway_core::{
    ConversationContext, Frame, FrameProcessor, LanguageModel, ProcessorContext, Result,
};

/// Generates a reply for each final transcript.
///
/// The full conversation history is the prompt on every turn. Generation
/// is streamed so first-chunk latency can be observed, but the reply is
/// emitted as one `SynthesisText` once complete; synthesizing fragments
/// mid-generation produces choppy audio on the telephony side. If the
/// model stays unavailable after the adapter's retries, the configured
/// fallback utterance is spoken instead of leaving the caller in silence.
pub struct LlmStage {
    llm: Arc<dyn LanguageModel>,
    conversation: Arc<Mutex<ConversationContext>>,
    fallback_utterance: String,
}

impl LlmStage {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        conversation: Arc<Mutex<ConversationContext>>,
        fallback_utterance: String,
    ) -> Self {
        Self {
            llm,
            conversation,
            fallback_utterance,
        }
    }
}

#[async_trait]
impl FrameProcessor for LlmStage {
    async fn process(&self, frame: Frame, context: &mut ProcessorContext) -> Result<Vec<Frame>> {
        match frame {
            Frame::TranscriptFinal { text } => {
                if text.trim().is_empty() {
                    return Ok(vec![]);
                }
                let turns = self.conversation.lock().turns().to_vec();

                let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(32);
                let generate = self.llm.generate(&turns, chunk_tx);
                let drain = async {
                    let mut chunks = 0usize;
                    while chunk_rx.recv().await.is_some() {
                        chunks += 1;
                    }
                    chunks
                };
                let (reply, chunks) = tokio::join!(generate, drain);

                match reply {
                    Ok(reply) if reply.trim().is_empty() => {
                        debug!(backend = self.llm.name(), "empty reply, dropping");
                        Ok(vec![])
                    }
                    Ok(reply) => {
                        debug!(
                            call_id = %context.call_id,
                            backend = self.llm.name(),
                            chunks,
                            chars = reply.len(),
                            "reply generated"
                        );
                        Ok(vec![Frame::SynthesisText { text: reply }])
                    }
                    Err(error) => {
                        warn!(
                            backend = self.llm.name(),
                            %error,
                            "generation failed, speaking fallback"
                        );
                        Ok(vec![
                            Frame::Error {
                                stage: "llm".to_string(),
                                message: error.to_string(),
                                recoverable: true,
                            },
                            Frame::SynthesisText {
                                text: self.fallback_utterance.clone(),
                            },
                        ])
                    }
                }
            }
            Frame::Lifecycle(_) => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
