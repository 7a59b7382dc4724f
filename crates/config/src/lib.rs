//! Configuration for the voice gateway
//!
//! Settings are layered: built-in defaults, then `config/default.toml`,
//! then `config/{env}.toml`, then `VOICE_GATEWAY_*` environment variables.

pub mod constants;
mod settings;

pub use settings::{
    load_settings, BackendServiceConfig, BackendsConfig, ConfigError, InterruptionConfig,
    MediaConfig, PipelineConfig, ServerConfig, Settings, VadConfig,
};
