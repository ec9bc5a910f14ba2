//! HTTP transcription client
//!
//! Ships one finalized utterance payload to the remote transcription
//! endpoint and returns the recognized text. Non-2xx responses, empty
//! results, and timeouts all surface as `Error::Transcription`; requests
//! that never reach the endpoint surface as `Error::Network` so the caller
//! can pick the right user-facing message.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use bima_core::{Error, Result, Transcriber, UtterancePayload};
use bima_config::constants::timeouts;
use bima_config::TranscriptionSettings;

/// Transcription client configuration
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Base URL of the transcription service
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: bima_config::constants::endpoints::TRANSCRIBE_DEFAULT.to_string(),
            timeout: Duration::from_millis(timeouts::TRANSCRIBE_MS),
        }
    }
}

impl From<&TranscriptionSettings> for TranscriberConfig {
    fn from(settings: &TranscriptionSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

/// Response from the transcription service
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// HTTP transcription collaborator
pub struct HttpTranscriber {
    config: TranscriberConfig,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transcription(format!("http client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn classify(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Transcription("request timed out".to_string())
        } else if e.is_connect() {
            Error::Network(e.to_string())
        } else {
            Error::Transcription(e.to_string())
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, payload: &UtterancePayload) -> Result<String> {
        let url = format!("{}/transcribe", self.config.endpoint);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, payload.mime)
            .header("X-Language", payload.language.code())
            .body(payload.bytes.clone())
            .send()
            .await
            .map_err(Self::classify)?;

        if !response.status().is_success() {
            return Err(Error::Transcription(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("invalid response: {}", e)))?;

        let text = body.text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Transcription("empty transcript".to_string()));
        }

        tracing::debug!(
            chars = text.len(),
            confidence = ?body.confidence,
            "transcription complete"
        );

        Ok(text)
    }

    fn name(&self) -> &str {
        "http-transcriber"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = TranscriptionSettings::default();
        let config = TranscriberConfig::from(&settings);
        assert_eq!(config.timeout, Duration::from_millis(12_000));
        assert!(!config.endpoint.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Port 9 (discard) is not listening; connection must be refused
        let transcriber = HttpTranscriber::new(TranscriberConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(2000),
        })
        .unwrap();

        let payload = UtterancePayload {
            bytes: vec![0u8; 2000],
            mime: "audio/wav",
            language: bima_core::Language::English,
            duration: Duration::from_secs(1),
        };

        let err = transcriber.transcribe(&payload).await.unwrap_err();
        assert!(err.is_network(), "expected network classification, got {err:?}");
    }
}
