//! Chat-completion integration
//!
//! Provides the HTTP backend for the remote chat-completion collaborator
//! (OpenAI-compatible wire format) and the bilingual prompt assembly.

pub mod backend;
pub mod prompt;

pub use backend::{ChatBackendConfig, HttpChatBackend};
pub use prompt::{system_prompt, PromptBuilder};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(err.to_string())
        } else {
            LlmError::Api(err.to_string())
        }
    }
}

impl From<LlmError> for bima_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Network(msg) => bima_core::Error::Network(msg),
            other => bima_core::Error::Completion(other.to_string()),
        }
    }
}
