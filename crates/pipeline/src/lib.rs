//! Per-call frame pipeline
//!
//! Audio decoded from RTP enters as `Frame::AudioInput`, flows through
//! VAD → speech-to-text → context aggregation → language model →
//! text-to-speech → output, and leaves as PCM pushed to the call's RTP
//! egress. Stages run on their own tokio tasks connected by bounded
//! channels; frame order is preserved per stage, and a failure inside one
//! stage is logged and contained rather than crashing the call.

pub mod builder;
pub mod interruption;
pub mod processors;
pub mod vad;

pub use builder::{build_pipeline, PipelineBackends, PipelineHandles};
pub use interruption::{
    InterruptionManager, InterruptionSnapshot, InterruptionStrategy, VolumeStrategy,
    WordCountStrategy,
};
pub use processors::ProcessorChain;
pub use vad::{EnergyClassifier, SpeechClassifier, VadEngine, VadEvent, VadState};
