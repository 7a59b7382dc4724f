//! Pipeline stages and the chain that runs them
//!
//! Stages implement `FrameProcessor` and are linked into a
//! [`ProcessorChain`], which spawns one tokio task per stage connected by
//! bounded channels. Lifecycle frames are propagated by the chain itself;
//! stages never emit them from `process`.

mod aggregator;
mod chain;
mod llm_stage;
mod output;
mod stt_stage;
mod tts_stage;
mod vad_stage;

pub use aggregator::{AssistantTurnAggregator, UserTurnAggregator};
pub use chain::ProcessorChain;
pub use llm_stage::LlmStage;
pub use output::OutputStage;
pub use stt_stage::SttStage;
pub use tts_stage::TtsStage;
pub use vad_stage::VadStage;
