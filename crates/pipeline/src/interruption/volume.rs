//! Volume-based interruption strategy

use super::InterruptionStrategy;
use std::time::{Duration, Instant};
use voice_gateway_config::constants::interruption::VOLUME_STALE_MS;
use voice_gateway_config::InterruptionConfig;
use voice_gateway_core::AudioFrame;

/// Interrupt on sustained loud caller audio, independent of any
/// transcript.
///
/// Loudness is accumulated in audio time: every frame whose normalized RMS
/// meets the threshold adds its duration to a running total, and the
/// strategy triggers once the total reaches the minimum. Quiet frames do
/// not drain the total; only a stale gap between appends (the caller's
/// audio stream went away for over a second) or an explicit reset clears
/// it.
pub struct VolumeStrategy {
    threshold: f32,
    min_duration: Duration,
    stale_after: Duration,
    loud: Duration,
    last_append: Option<Instant>,
}

impl VolumeStrategy {
    pub fn new(threshold: f32, min_duration_ms: u64, stale_ms: u64) -> Self {
        Self {
            threshold,
            min_duration: Duration::from_millis(min_duration_ms),
            stale_after: Duration::from_millis(stale_ms),
            loud: Duration::ZERO,
            last_append: None,
        }
    }

    pub fn from_config(config: &InterruptionConfig) -> Self {
        Self::new(
            config.volume_threshold,
            config.volume_min_duration_ms,
            VOLUME_STALE_MS,
        )
    }
}

impl InterruptionStrategy for VolumeStrategy {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn append_audio(&mut self, frame: &AudioFrame) {
        let now = Instant::now();
        if let Some(last) = self.last_append {
            if now.duration_since(last) > self.stale_after {
                self.loud = Duration::ZERO;
            }
        }
        self.last_append = Some(now);

        if frame.rms() >= self.threshold {
            self.loud += frame.duration();
        }
    }

    fn should_interrupt(&self) -> bool {
        self.loud >= self.min_duration
    }

    fn reset(&mut self) {
        self.loud = Duration::ZERO;
        self.last_append = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20ms at 16kHz, normalized RMS well above 0.12
    fn loud_frame() -> AudioFrame {
        AudioFrame::new(vec![12000i16; 320], 16000)
    }

    fn quiet_frame() -> AudioFrame {
        AudioFrame::new(vec![100i16; 320], 16000)
    }

    #[test]
    fn triggers_after_sustained_loudness() {
        let mut strategy = VolumeStrategy::new(0.12, 400, 1000);
        // 19 loud frames = 380ms, one short of the threshold
        for _ in 0..19 {
            strategy.append_audio(&loud_frame());
            assert!(!strategy.should_interrupt());
        }
        strategy.append_audio(&loud_frame());
        assert!(strategy.should_interrupt());
    }

    #[test]
    fn quiet_frames_do_not_drain_progress() {
        let mut strategy = VolumeStrategy::new(0.12, 400, 1000);
        for _ in 0..10 {
            strategy.append_audio(&loud_frame());
        }
        for _ in 0..5 {
            strategy.append_audio(&quiet_frame());
        }
        for _ in 0..10 {
            strategy.append_audio(&loud_frame());
        }
        assert!(strategy.should_interrupt());
    }

    #[test]
    fn quiet_audio_never_triggers() {
        let mut strategy = VolumeStrategy::new(0.12, 400, 1000);
        for _ in 0..50 {
            strategy.append_audio(&quiet_frame());
        }
        assert!(!strategy.should_interrupt());
    }

    #[test]
    fn stale_gap_restarts_accumulation() {
        let mut strategy = VolumeStrategy::new(0.12, 400, 30);
        for _ in 0..19 {
            strategy.append_audio(&loud_frame());
        }
        std::thread::sleep(Duration::from_millis(50));
        // the gap exceeded the stale window, so this frame starts over
        strategy.append_audio(&loud_frame());
        assert!(!strategy.should_interrupt());
    }

    #[test]
    fn reset_clears_progress() {
        let mut strategy = VolumeStrategy::new(0.12, 400, 1000);
        for _ in 0..20 {
            strategy.append_audio(&loud_frame());
        }
        assert!(strategy.should_interrupt());
        strategy.reset();
        assert!(!strategy.should_interrupt());
    }
}
