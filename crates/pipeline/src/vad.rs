//! Voice activity detection
//!
//! A hysteresis state machine driven once per fixed-size audio frame.
//! Frame classification is pluggable behind `SpeechClassifier`; the
//! energy-based classifier is the default, a model-based one can replace
//! it behind the same boolean interface.

use voice_gateway_config::constants::vad::POSSIBLE_END_FRAMES;
use voice_gateway_config::VadConfig;
use voice_gateway_core::AudioFrame;

/// Classifies a single frame as speech or silence
pub trait SpeechClassifier: Send + Sync {
    fn is_speech(&self, frame: &AudioFrame) -> bool;
}

/// Energy-threshold classifier: a frame is speech when enough samples
/// exceed an amplitude threshold.
pub struct EnergyClassifier {
    amplitude_threshold: i16,
    active_sample_ratio: f32,
}

impl EnergyClassifier {
    pub fn new(amplitude_threshold: i16, active_sample_ratio: f32) -> Self {
        Self {
            amplitude_threshold,
            active_sample_ratio,
        }
    }

    pub fn from_config(config: &VadConfig) -> Self {
        Self::new(config.amplitude_threshold, config.active_sample_ratio)
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn is_speech(&self, frame: &AudioFrame) -> bool {
        if frame.is_empty() {
            return false;
        }
        let active = frame.samples_above(self.amplitude_threshold);
        active as f32 >= self.active_sample_ratio * frame.len() as f32
    }
}

/// VAD state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    /// No speech detected
    #[default]
    Silence,
    /// Caller speech confirmed
    Speaking,
    /// Accumulating silence; the utterance may be over
    PossibleEnd,
    /// Caller speech confirmed while the agent was playing audio
    BargeIn,
}

/// Speech boundary events; the only way downstream stages learn about
/// speech boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    UserStartedSpeaking {
        /// True when the agent was playing audio at confirmation time
        barge_in: bool,
    },
    UserStoppedSpeaking {
        /// Length of the speech segment in milliseconds
        duration_ms: u64,
    },
}

/// Hysteresis state machine over a pluggable frame classifier.
///
/// One instance per call, driven only by that call's pipeline task, so no
/// internal locking is needed.
pub struct VadEngine {
    classifier: Box<dyn SpeechClassifier>,
    state: VadState,
    speech_frames: u32,
    silence_frames: u32,
    speech_threshold_frames: u32,
    silence_threshold_frames: u32,
    /// Frames spent in Speaking/BargeIn/PossibleEnd, for event durations
    utterance_frames: u64,
    frame_ms: u64,
}

impl VadEngine {
    pub fn new(config: &VadConfig, frame_ms: u32, classifier: Box<dyn SpeechClassifier>) -> Self {
        Self {
            classifier,
            state: VadState::Silence,
            speech_frames: 0,
            silence_frames: 0,
            speech_threshold_frames: config.speech_threshold_frames,
            silence_threshold_frames: config.silence_threshold_frames,
            utterance_frames: 0,
            frame_ms: frame_ms as u64,
        }
    }

    pub fn with_energy_classifier(config: &VadConfig, frame_ms: u32) -> Self {
        Self::new(
            config,
            frame_ms,
            Box::new(EnergyClassifier::from_config(config)),
        )
    }

    /// Current state
    pub fn state(&self) -> VadState {
        self.state
    }

    /// Drive the state machine with one audio frame.
    ///
    /// `bot_speaking` selects between `Speaking` and `BargeIn` when speech
    /// is confirmed. Returns a boundary event on the transitions into
    /// `Speaking`/`BargeIn` and into `Silence`, nothing otherwise.
    pub fn process_frame(&mut self, frame: &AudioFrame, bot_speaking: bool) -> Option<VadEvent> {
        let is_speech = self.classifier.is_speech(frame);
        if self.state != VadState::Silence {
            self.utterance_frames += 1;
        }

        if is_speech {
            self.silence_frames = 0;
            self.speech_frames += 1;

            if self.speech_frames >= self.speech_threshold_frames
                && !matches!(self.state, VadState::Speaking | VadState::BargeIn)
            {
                self.state = if bot_speaking {
                    VadState::BargeIn
                } else {
                    VadState::Speaking
                };
                self.utterance_frames = self.speech_frames as u64;
                return Some(VadEvent::UserStartedSpeaking {
                    barge_in: bot_speaking,
                });
            }
        } else {
            self.speech_frames = 0;
            self.silence_frames += 1;

            match self.state {
                VadState::Speaking | VadState::BargeIn => {
                    if self.silence_frames >= POSSIBLE_END_FRAMES {
                        self.state = VadState::PossibleEnd;
                    }
                }
                VadState::PossibleEnd => {
                    if self.silence_frames >= self.silence_threshold_frames {
                        self.state = VadState::Silence;
                        let duration_ms = self.utterance_frames * self.frame_ms;
                        self.utterance_frames = 0;
                        self.silence_frames = 0;
                        return Some(VadEvent::UserStoppedSpeaking { duration_ms });
                    }
                }
                VadState::Silence => {}
            }
        }

        None
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.speech_frames = 0;
        self.silence_frames = 0;
        self.utterance_frames = 0;
    }
}
