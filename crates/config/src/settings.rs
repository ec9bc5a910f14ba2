//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use bima_core::Language;

use crate::constants::{call, endpoints, recorder, timeouts, vad};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice activity detection tuning
    #[serde(default)]
    pub vad: VadSettings,

    /// Chat-completion collaborator
    #[serde(default)]
    pub chat: ChatSettings,

    /// Transcription collaborator
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Call session behavior
    #[serde(default)]
    pub call: CallSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS origin checking (disable only for development)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum concurrent call sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Voice activity detection tuning
///
/// These are hardware/environment-dependent values; the shipped defaults
/// come from [`crate::constants::vad`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadSettings {
    /// Normalized level above which a sample counts as speech (0–1)
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,

    /// Minimum recording time before a silence timer may arm (ms)
    #[serde(default = "default_min_recording_ms")]
    pub min_recording_ms: u64,

    /// Uninterrupted silence that ends an utterance (ms)
    #[serde(default = "default_silence_duration_ms")]
    pub silence_duration_ms: u64,
}

fn default_silence_threshold() -> f32 {
    vad::SILENCE_THRESHOLD
}

fn default_min_recording_ms() -> u64 {
    vad::MIN_RECORDING_DURATION_MS
}

fn default_silence_duration_ms() -> u64 {
    vad::SILENCE_DURATION_MS
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            silence_threshold: default_silence_threshold(),
            min_recording_ms: default_min_recording_ms(),
            silence_duration_ms: default_silence_duration_ms(),
        }
    }
}

/// Chat-completion collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with each request
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout (ms)
    #[serde(default = "default_completion_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_chat_endpoint() -> String {
    endpoints::CHAT_DEFAULT.to_string()
}

fn default_chat_model() -> String {
    "insurance-assistant".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.7
}

fn default_completion_timeout_ms() -> u64 {
    timeouts::COMPLETION_MS
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            api_key: None,
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_completion_timeout_ms(),
        }
    }
}

/// Transcription collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Base URL of the transcription endpoint
    #[serde(default = "default_transcribe_endpoint")]
    pub endpoint: String,

    /// Request timeout (ms)
    #[serde(default = "default_transcribe_timeout_ms")]
    pub timeout_ms: u64,

    /// Payloads under this size are discarded without a request (bytes)
    #[serde(default = "default_min_payload_bytes")]
    pub min_payload_bytes: usize,
}

fn default_transcribe_endpoint() -> String {
    endpoints::TRANSCRIBE_DEFAULT.to_string()
}

fn default_transcribe_timeout_ms() -> u64 {
    timeouts::TRANSCRIBE_MS
}

fn default_min_payload_bytes() -> usize {
    recorder::MIN_PAYLOAD_BYTES
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_transcribe_endpoint(),
            timeout_ms: default_transcribe_timeout_ms(),
            min_payload_bytes: default_min_payload_bytes(),
        }
    }
}

/// Call session behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSettings {
    /// Simulated connect delay before the call goes active (ms)
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,

    /// Language used when a session does not specify one
    #[serde(default)]
    pub default_language: Language,

    /// Emit a user-visible error event when a mid-call round-trip fails.
    /// Off by default: the call continues silently and re-arms listening.
    #[serde(default)]
    pub surface_turn_errors: bool,

    /// Pace of the simulated synthesizer (words/minute)
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate_wpm: u32,
}

fn default_connect_delay_ms() -> u64 {
    call::CONNECT_DELAY_MS
}

fn default_speaking_rate() -> u32 {
    call::SPEAKING_RATE_WPM
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            connect_delay_ms: default_connect_delay_ms(),
            default_language: Language::default(),
            surface_turn_errors: false,
            speaking_rate_wpm: default_speaking_rate(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default tracing filter (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_vad()?;
        self.validate_network()?;
        Ok(())
    }

    fn validate_vad(&self) -> Result<(), ConfigError> {
        let vad = &self.vad;

        if !(0.0..=1.0).contains(&vad.silence_threshold) || vad.silence_threshold == 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "vad.silence_threshold".to_string(),
                message: format!(
                    "Must be in (0.0, 1.0], got {}",
                    vad.silence_threshold
                ),
            });
        }

        if vad.silence_duration_ms <= vad.min_recording_ms {
            return Err(ConfigError::InvalidValue {
                field: "vad.silence_duration_ms".to_string(),
                message: format!(
                    "Silence window ({} ms) must exceed the minimum recording gate ({} ms)",
                    vad.silence_duration_ms, vad.min_recording_ms
                ),
            });
        }

        Ok(())
    }

    fn validate_network(&self) -> Result<(), ConfigError> {
        for (field, ms) in [
            ("chat.timeout_ms", self.chat.timeout_ms),
            ("transcription.timeout_ms", self.transcription.timeout_ms),
        ] {
            if !(1_000..=60_000).contains(&ms) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Timeout must be between 1s and 60s, got {} ms", ms),
                });
            }
        }

        if self.chat.endpoint.is_empty() {
            return Err(ConfigError::MissingField("chat.endpoint".to_string()));
        }
        if self.transcription.endpoint.is_empty() {
            return Err(ConfigError::MissingField(
                "transcription.endpoint".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars (BIMA_ prefix) > config/{env}.yaml > config/default.yaml
/// > built-in defaults. Missing files are fine; invalid values are not.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = Path::new("config/default.yaml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    if let Some(env_name) = env {
        let env_path_buf = format!("config/{}.yaml", env_name);
        let env_path = Path::new(&env_path_buf);
        if env_path.exists() {
            builder = builder.add_source(File::from(env_path));
        } else {
            tracing::warn!(path = %env_path_buf, "Environment config file not found, skipping");
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("BIMA")
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
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.vad.silence_threshold, 0.02);
        assert_eq!(settings.vad.min_recording_ms, 500);
        assert_eq!(settings.vad.silence_duration_ms, 1500);
        assert_eq!(settings.transcription.min_payload_bytes, 1000);
        assert!(!settings.call.surface_turn_errors);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut settings = Settings::default();
        settings.vad.silence_threshold = 0.0;
        assert!(settings.validate().is_err());

        settings.vad.silence_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_silence_must_exceed_min_recording() {
        let mut settings = Settings::default();
        settings.vad.silence_duration_ms = 400;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut settings = Settings::default();
        settings.chat.timeout_ms = 100;
        assert!(settings.validate().is_err());
    }
}
