//! Configuration management for the insurance voice agent
//!
//! Supports loading configuration from:
//! - YAML files (config/default.yaml, config/{env}.yaml)
//! - Environment variables (BIMA_ prefix)
//!
//! Tuning defaults live in [`constants`] as the single source of truth;
//! the [`Settings`] tree overrides them per deployment.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, CallSettings, ChatSettings, ObservabilityConfig, RuntimeEnvironment,
    ServerConfig, Settings, TranscriptionSettings, VadSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
