//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants::{audio, interruption, telephony, vad};

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP signaling/observability surface
    #[serde(default)]
    pub server: ServerConfig,

    /// RTP media configuration
    #[serde(default)]
    pub media: MediaConfig,

    /// Per-call pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Backend AI service endpoints
    #[serde(default)]
    pub backends: BackendsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

/// RTP media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// IP to bind RTP sockets on and advertise in SDP answers
    #[serde(default = "default_rtp_ip")]
    pub rtp_ip: String,
    /// First port of the RTP range
    #[serde(default = "default_port_min")]
    pub port_min: u16,
    /// Last port of the RTP range (inclusive)
    #[serde(default = "default_port_max")]
    pub port_max: u16,
    /// Default RTP payload type for egress (0 = PCMU)
    #[serde(default)]
    pub payload_type: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            rtp_ip: default_rtp_ip(),
            port_min: default_port_min(),
            port_max: default_port_max(),
            payload_type: 0,
        }
    }
}

fn default_rtp_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port_min() -> u16 {
    telephony::PORT_MIN
}

fn default_port_max() -> u16 {
    telephony::PORT_MAX
}

/// Per-call pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline PCM sample rate (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Audio frame duration (ms)
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
    /// Bounded channel capacity between stages
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Call setup timeout (ms)
    #[serde(default = "default_setup_timeout_ms")]
    pub call_setup_timeout_ms: u64,
    /// VAD configuration
    #[serde(default)]
    pub vad: VadConfig,
    /// Interruption/barge-in configuration
    #[serde(default)]
    pub interruption: InterruptionConfig,
    /// System prompt seeded into every call's conversation context
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_ms: default_frame_ms(),
            channel_capacity: default_channel_capacity(),
            call_setup_timeout_ms: default_setup_timeout_ms(),
            vad: VadConfig::default(),
            interruption: InterruptionConfig::default(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_sample_rate() -> u32 {
    audio::PIPELINE_RATE
}

fn default_frame_ms() -> u32 {
    audio::FRAME_MS
}

fn default_channel_capacity() -> usize {
    64
}

fn default_setup_timeout_ms() -> u64 {
    telephony::CALL_SETUP_TIMEOUT_MS
}

fn default_system_prompt() -> String {
    "You are a helpful voice assistant on a phone call. Respond concisely \
     and naturally; your replies will be spoken aloud."
        .to_string()
}

/// VAD configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// Consecutive speech frames before speech is confirmed
    #[serde(default = "default_speech_threshold")]
    pub speech_threshold_frames: u32,
    /// Consecutive silence frames before an utterance is closed
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_frames: u32,
    /// Amplitude above which a sample counts as active
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: i16,
    /// Fraction of active samples that marks a frame as speech
    #[serde(default = "default_sample_ratio")]
    pub active_sample_ratio: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            speech_threshold_frames: default_speech_threshold(),
            silence_threshold_frames: default_silence_threshold(),
            amplitude_threshold: default_amplitude_threshold(),
            active_sample_ratio: default_sample_ratio(),
        }
    }
}

fn default_speech_threshold() -> u32 {
    vad::SPEECH_THRESHOLD_FRAMES
}

fn default_silence_threshold() -> u32 {
    vad::SILENCE_THRESHOLD_FRAMES
}

fn default_amplitude_threshold() -> i16 {
    audio::SPEECH_AMPLITUDE_THRESHOLD
}

fn default_sample_ratio() -> f32 {
    audio::SPEECH_SAMPLE_RATIO
}

/// Interruption/barge-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionConfig {
    /// Enable barge-in handling
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum transcript words before the word-count strategy triggers
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    /// Normalized RMS threshold for the volume strategy
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: f32,
    /// Sustained loud duration before the volume strategy triggers (ms)
    #[serde(default = "default_volume_min_duration")]
    pub volume_min_duration_ms: u64,
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_words: default_min_words(),
            volume_threshold: default_volume_threshold(),
            volume_min_duration_ms: default_volume_min_duration(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_words() -> usize {
    interruption::MIN_WORDS
}

fn default_volume_threshold() -> f32 {
    interruption::VOLUME_THRESHOLD
}

fn default_volume_min_duration() -> u64 {
    interruption::VOLUME_MIN_DURATION_MS
}

/// One backend AI service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendServiceConfig {
    /// Service base URL
    pub endpoint: String,
    /// Request timeout (ms)
    #[serde(default = "default_backend_timeout")]
    pub timeout_ms: u64,
    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff duration, doubles each retry (ms)
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

impl BackendServiceConfig {
    fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout_ms: default_backend_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

fn default_backend_timeout() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

/// Backend AI service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "default_stt")]
    pub stt: BackendServiceConfig,
    #[serde(default = "default_llm")]
    pub llm: BackendServiceConfig,
    #[serde(default = "default_tts")]
    pub tts: BackendServiceConfig,
    /// Spoken when a backend stays unavailable after retries
    #[serde(default = "default_fallback_utterance")]
    pub fallback_utterance: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            stt: default_stt(),
            llm: default_llm(),
            tts: default_tts(),
            fallback_utterance: default_fallback_utterance(),
        }
    }
}

fn default_stt() -> BackendServiceConfig {
    BackendServiceConfig::with_endpoint("http://127.0.0.1:9001")
}

fn default_llm() -> BackendServiceConfig {
    BackendServiceConfig::with_endpoint("http://127.0.0.1:9002")
}

fn default_tts() -> BackendServiceConfig {
    BackendServiceConfig::with_endpoint("http://127.0.0.1:9003")
}

fn default_fallback_utterance() -> String {
    "I'm sorry, I'm having trouble right now. Could you repeat that?".to_string()
}

impl Settings {
    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media.port_min > self.media.port_max {
            return Err(ConfigError::Invalid(format!(
                "media.port_min ({}) exceeds media.port_max ({})",
                self.media.port_min, self.media.port_max
            )));
        }
        if self.pipeline.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.sample_rate must be non-zero".to_string(),
            ));
        }
        if self.pipeline.frame_ms == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.frame_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings with file and environment layering.
///
/// Priority: `VOICE_GATEWAY_*` env vars > `config/{env}.toml` >
/// `config/default.toml` > built-in defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    if let Some(env_name) = env {
        let env_path = format!("config/{env_name}.toml");
        if Path::new(&env_path).exists() {
            builder = builder.add_source(File::with_name(&env_path));
        } else {
            tracing::warn!(env = env_name, "no config file for environment, skipping");
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_GATEWAY")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.media.payload_type, 0);
        assert_eq!(settings.pipeline.vad.speech_threshold_frames, 3);
        assert_eq!(settings.pipeline.interruption.min_words, 2);
    }

    #[test]
    fn inverted_port_range_rejected() {
        let mut settings = Settings::default();
        settings.media.port_min = 20000;
        settings.media.port_max = 10000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn deserializes_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [media]
            port_min = 40000
            port_max = 40100

            [pipeline.vad]
            speech_threshold_frames = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.media.port_min, 40000);
        assert_eq!(settings.pipeline.vad.speech_threshold_frames, 5);
        // untouched sections fall back to defaults
        assert_eq!(settings.pipeline.sample_rate, 16000);
    }
}
