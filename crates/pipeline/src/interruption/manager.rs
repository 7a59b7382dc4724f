//! Interruption manager

use super::{InterruptionStrategy, VolumeStrategy, WordCountStrategy};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};
use voice_gateway_config::InterruptionConfig;
use voice_gateway_core::AudioFrame;

struct ManagerState {
    bot_speaking: bool,
    user_speaking: bool,
    interruption_active: bool,
    strategies: Vec<Box<dyn InterruptionStrategy>>,
}

/// Point-in-time view of the manager, for call stats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptionSnapshot {
    pub bot_speaking: bool,
    pub user_speaking: bool,
    pub interruption_active: bool,
    /// Total playback stops issued over the call
    pub stop_count: u64,
}

/// Decides when confirmed caller speech should stop agent playback.
///
/// Evidence is fed to the strategies only while the agent is speaking.
/// Audio evidence is evaluated only once the VAD has confirmed caller
/// speech; transcript evidence is its own confirmation, since transcripts
/// may arrive after the VAD has already closed the utterance. Any single
/// positive strategy triggers. The stop signal is a monotonically
/// increasing counter on a watch channel; the output stage subscribes and
/// discards queued playback whenever the counter moves. A single mutex
/// around the whole state makes trigger/reset races impossible: whichever
/// of "strategy fired" and "bot finished speaking" takes the lock first
/// wins, and the loser sees consistent state.
pub struct InterruptionManager {
    enabled: bool,
    state: Mutex<ManagerState>,
    stop_tx: watch::Sender<u64>,
}

impl InterruptionManager {
    pub fn new(config: &InterruptionConfig) -> Self {
        let strategies: Vec<Box<dyn InterruptionStrategy>> = vec![
            Box::new(WordCountStrategy::new(config.min_words)),
            Box::new(VolumeStrategy::from_config(config)),
        ];
        let (stop_tx, _) = watch::channel(0);
        Self {
            enabled: config.enabled,
            state: Mutex::new(ManagerState {
                bot_speaking: false,
                user_speaking: false,
                interruption_active: false,
                strategies,
            }),
            stop_tx,
        }
    }

    /// Subscribe to playback-stop signals
    pub fn subscribe_stop(&self) -> watch::Receiver<u64> {
        self.stop_tx.subscribe()
    }

    /// Record that agent playback started or finished.
    ///
    /// Finishing playback ends any active interruption and discards
    /// accumulated evidence.
    pub fn set_bot_speaking(&self, speaking: bool) {
        let mut state = self.state.lock();
        state.bot_speaking = speaking;
        if !speaking {
            state.interruption_active = false;
            for strategy in &mut state.strategies {
                strategy.reset();
            }
        }
    }

    /// VAD confirmed the caller started speaking
    pub fn on_user_speech_start(&self) {
        self.state.lock().user_speaking = true;
    }

    /// VAD confirmed the caller stopped speaking
    pub fn on_user_speech_end(&self) {
        let mut state = self.state.lock();
        state.user_speaking = false;
        for strategy in &mut state.strategies {
            strategy.reset();
        }
    }

    /// Feed one frame of caller audio. Returns true when this frame
    /// triggered an interruption.
    pub fn observe_audio(&self, frame: &AudioFrame) -> bool {
        if !self.enabled {
            return false;
        }
        let mut state = self.state.lock();
        if !state.bot_speaking {
            return false;
        }
        for strategy in &mut state.strategies {
            strategy.append_audio(frame);
        }
        if !state.user_speaking {
            return false;
        }
        self.evaluate(&mut state)
    }

    /// Feed the latest partial transcript. Returns true when it triggered
    /// an interruption.
    pub fn observe_transcript(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let mut state = self.state.lock();
        if !state.bot_speaking {
            return false;
        }
        for strategy in &mut state.strategies {
            strategy.append_text(text);
        }
        self.evaluate(&mut state)
    }

    /// Whether an interruption is currently in effect
    pub fn interruption_active(&self) -> bool {
        self.state.lock().interruption_active
    }

    pub fn snapshot(&self) -> InterruptionSnapshot {
        let state = self.state.lock();
        InterruptionSnapshot {
            bot_speaking: state.bot_speaking,
            user_speaking: state.user_speaking,
            interruption_active: state.interruption_active,
            stop_count: *self.stop_tx.borrow(),
        }
    }

    fn evaluate(&self, state: &mut ManagerState) -> bool {
        if state.interruption_active {
            return false;
        }
        let fired = state
            .strategies
            .iter()
            .find(|s| s.should_interrupt())
            .map(|s| s.name());
        let Some(strategy) = fired else {
            return false;
        };

        info!(strategy, "caller interruption confirmed, stopping playback");
        state.interruption_active = true;
        state.bot_speaking = false;
        for s in &mut state.strategies {
            s.reset();
        }
        self.stop_tx.send_modify(|n| *n += 1);
        debug!(stop_count = *self.stop_tx.borrow(), "stop signal sent");
        true
    }
}
