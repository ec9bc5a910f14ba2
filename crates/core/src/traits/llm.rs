//! Chat-completion boundary trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a chat message, matching the wire format of the completion API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion collaborator
///
/// Request is the ordered conversation history plus a system prompt;
/// response is a single assistant text. Failures surface as
/// [`crate::Error::Completion`] or [`crate::Error::Network`].
#[async_trait]
pub trait ChatCompletion: Send + Sync + 'static {
    /// Produce the assistant reply for the given system prompt and history
    async fn complete(&self, system: &str, history: &[ChatMessage]) -> Result<String>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
