//! Speech boundary traits: transcription and synthesis

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::language::Language;

/// One finalized utterance, packaged for the transcription endpoint
#[derive(Debug, Clone)]
pub struct UtterancePayload {
    /// Encoded audio bytes (container per `mime`)
    pub bytes: Vec<u8>,
    /// Container/mime hint for the endpoint, e.g. `audio/wav`
    pub mime: &'static str,
    /// Language the speaker is expected to use
    pub language: Language,
    /// Captured speech duration
    pub duration: Duration,
}

impl UtterancePayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transcription collaborator
///
/// Sends one finished utterance payload and returns recognized text.
/// Network errors, non-2xx responses, timeouts, and empty results all
/// surface as [`crate::Error::Transcription`] (or [`crate::Error::Network`]
/// when the endpoint was never reached).
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe a finalized utterance
    async fn transcribe(&self, payload: &UtterancePayload) -> Result<String>;

    /// Endpoint/engine name for logging
    fn name(&self) -> &str;
}

/// Speech-synthesis collaborator
///
/// `speak` resolves when the utterance has been fully voiced (or was
/// cancelled). `cancel` must immediately silence any in-progress utterance;
/// it is the hang-up path and must never block.
#[async_trait]
pub trait Synthesizer: Send + Sync + 'static {
    /// Speak the text aloud in the given language
    async fn speak(&self, text: &str, language: Language) -> Result<()>;

    /// Immediately stop any in-progress utterance
    fn cancel(&self);

    /// Engine name for logging
    fn name(&self) -> &str;
}
