//! HTTP chat-completion backend
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format: an ordered
//! message list (system prompt first) in, a single assistant message out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use bima_core::{ChatCompletion, ChatMessage, Result};
use bima_config::constants::timeouts;
use bima_config::ChatSettings;

use crate::LlmError;

/// Configuration for the chat backend
#[derive(Debug, Clone)]
pub struct ChatBackendConfig {
    /// Base URL, e.g. `http://localhost:8000/v1`
    pub endpoint: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ChatBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: bima_config::constants::endpoints::CHAT_DEFAULT.to_string(),
            api_key: None,
            model: "insurance-assistant".to_string(),
            max_tokens: 256,
            temperature: 0.7,
            timeout: Duration::from_millis(timeouts::COMPLETION_MS),
        }
    }
}

impl From<&ChatSettings> for ChatBackendConfig {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Chat-completion collaborator over HTTP
pub struct HttpChatBackend {
    config: ChatBackendConfig,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(config: ChatBackendConfig) -> std::result::Result<Self, LlmError> {
        if config.endpoint.is_empty() {
            return Err(LlmError::Configuration("empty endpoint".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn request(&self, messages: &[ChatMessage]) -> std::result::Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.endpoint);
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Api(format!("endpoint returned {}", status)));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".to_string()));
        }

        Ok(content)
    }
}

#[async_trait]
impl ChatCompletion for HttpChatBackend {
    async fn complete(&self, system: &str, history: &[ChatMessage]) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(history);

        let reply = self.request(&messages).await?;

        tracing::debug!(
            model = %self.config.model,
            turns = history.len(),
            reply_chars = reply.len(),
            "completion received"
        );

        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = ChatSettings::default();
        let config = ChatBackendConfig::from(&settings);
        assert_eq!(config.timeout, Duration::from_millis(12_000));
        assert_eq!(config.max_tokens, 256);
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = ChatBackendConfig {
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            HttpChatBackend::new(config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_maps_to_network() {
        let backend = HttpChatBackend::new(ChatBackendConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(2000),
            ..Default::default()
        })
        .unwrap();

        let err = backend
            .complete("system", &[ChatMessage::user("hello")])
            .await
            .unwrap_err();
        assert!(err.is_network(), "expected network error, got {err:?}");
    }
}
