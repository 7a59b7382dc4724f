//! Pipeline assembly

use crate::interruption::InterruptionManager;
use crate::processors::{
    AssistantTurnAggregator, LlmStage, OutputStage, ProcessorChain, SttStage, TtsStage,
    UserTurnAggregator, VadStage,
};
use crate::vad::VadEngine;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use voice_gateway_config::PipelineConfig;
use voice_gateway_core::{
    AudioFrame, ConversationContext, Frame, LanguageModel, ProcessorContext, SpeechToText,
    TextToSpeech,
};

/// The three backend services a pipeline talks to
pub struct PipelineBackends {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
}

/// Handles returned from [`build_pipeline`]
pub struct PipelineHandles {
    /// Feed decoded caller audio and lifecycle frames here
    pub input: mpsc::Sender<Frame>,
    /// Frames leaving the last stage: speech markers, partial transcripts,
    /// and contained errors. Closed once `Lifecycle(End)` has drained.
    pub events: mpsc::Receiver<Frame>,
    pub manager: Arc<InterruptionManager>,
    pub conversation: Arc<Mutex<ConversationContext>>,
}

/// Assemble and spawn the stage chain for one call.
///
/// The caller owns the lifecycle: send `Lifecycle(Start)` before any
/// audio, and `Lifecycle(End)` to drain and stop the chain. Synthesized
/// audio for the call's egress arrives on `audio_tx`.
pub fn build_pipeline(
    call_id: &str,
    config: &PipelineConfig,
    fallback_utterance: impl Into<String>,
    backends: PipelineBackends,
    audio_tx: mpsc::Sender<AudioFrame>,
) -> PipelineHandles {
    let manager = Arc::new(InterruptionManager::new(&config.interruption));
    let conversation = Arc::new(Mutex::new(ConversationContext::with_system_prompt(
        &config.system_prompt,
    )));
    let vad = VadEngine::with_energy_classifier(&config.vad, config.frame_ms);

    let chain = ProcessorChain::new(config.channel_capacity)
        .add(VadStage::new(vad, manager.clone()))
        .add(SttStage::new(backends.stt, manager.clone()))
        .add(UserTurnAggregator::new(conversation.clone()))
        .add(LlmStage::new(
            backends.llm,
            conversation.clone(),
            fallback_utterance.into(),
        ))
        .add(AssistantTurnAggregator::new(conversation.clone()))
        .add(TtsStage::new(backends.tts))
        .add(OutputStage::new(audio_tx, manager.clone()));

    info!(call_id, stages = chain.len(), "pipeline spawned");
    let (input, events) = chain.spawn(ProcessorContext::new(call_id));

    PipelineHandles {
        input,
        events,
        manager,
        conversation,
    }
}
