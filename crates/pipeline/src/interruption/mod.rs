//! Barge-in interruption handling
//!
//! While the agent is playing synthesized audio, interruption strategies
//! watch the caller's audio and transcripts and decide whether confirmed
//! speech is a real interruption or a backchannel ("mm-hm"). The manager
//! evaluates all strategies and, on the first positive, tells the output
//! side to stop playback through a watch channel rather than a callback.

mod manager;
mod volume;
mod word_count;

pub use manager::{InterruptionManager, InterruptionSnapshot};
pub use volume::VolumeStrategy;
pub use word_count::WordCountStrategy;

use voice_gateway_core::AudioFrame;

/// One heuristic for deciding whether confirmed caller speech should
/// interrupt agent playback.
///
/// Strategies accumulate evidence via the `append_*` methods and are
/// polled with [`should_interrupt`](InterruptionStrategy::should_interrupt)
/// after each append. The manager serializes all calls, so implementations
/// need no internal locking.
pub trait InterruptionStrategy: Send {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Feed one frame of caller audio
    fn append_audio(&mut self, _frame: &AudioFrame) {}

    /// Feed the latest partial transcript hypothesis
    fn append_text(&mut self, _text: &str) {}

    /// Whether the accumulated evidence warrants an interruption
    fn should_interrupt(&self) -> bool;

    /// Discard accumulated evidence
    fn reset(&mut self);
}
