//! Error taxonomy shared across the voice pipeline
//!
//! Every asynchronous collaborator failure is caught at the call site and
//! converted to one of these variants; none of them is allowed to tear down
//! a call session.

use crate::language::{Language, MessageKey};

/// Result alias using the shared error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced at the external-collaborator boundaries
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Microphone permission denied by the platform
    #[error("microphone permission denied: {0}")]
    Permission(String),

    /// Capture device failed or is unavailable
    #[error("audio device unavailable: {0}")]
    Device(String),

    /// Transcription endpoint failure, empty result, or timeout
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Chat-completion endpoint failure or timeout
    #[error("chat completion failed: {0}")]
    Completion(String),

    /// No speech-synthesis capability on this platform
    #[error("speech synthesis unsupported: {0}")]
    SynthesisUnsupported(String),

    /// Runtime speech-synthesis failure
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// OCR engine failure during document scanning
    #[error("ocr failed: {0}")]
    Ocr(String),

    /// The underlying request never reached the remote endpoint
    #[error("network unreachable: {0}")]
    Network(String),
}

impl Error {
    /// Whether this failure is a connectivity problem rather than a
    /// service-side one. Drives the "no internet" vs "try again" message.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// The localized message shown to the user for this failure
    pub fn user_message(&self, language: Language) -> &'static str {
        if self.is_network() {
            language.message(MessageKey::NetworkError)
        } else {
            language.message(MessageKey::GenericError)
        }
    }
}
