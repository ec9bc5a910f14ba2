//! Boundary traits for external collaborators
//!
//! The voice pipeline talks to four outside services: a transcription
//! endpoint, a chat-completion endpoint, a speech synthesizer, and an OCR
//! engine. Each is modeled as a small async trait so the call controller
//! can be exercised against mocks.

mod llm;
mod ocr;
mod speech;

pub use llm::{ChatCompletion, ChatMessage, ChatRole};
pub use ocr::OcrEngine;
pub use speech::{Synthesizer, Transcriber, UtterancePayload};
