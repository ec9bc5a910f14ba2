//! Core traits and types for the insurance voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Boundary traits for external collaborators (transcription, chat
//!   completion, speech synthesis, OCR)
//! - Audio frame types and level computation
//! - Conversation types (turns, transcript history)
//! - Language definitions and the bilingual message catalog
//! - Error taxonomy

pub mod audio;
pub mod conversation;
pub mod error;
pub mod language;
pub mod traits;

pub use audio::{AudioBuffer, AudioFrame, Channels, SampleRate};
pub use conversation::{Speaker, TranscriptHistory, Turn};
pub use error::{Error, Result};
pub use language::{Language, MessageKey};

pub use traits::{
    ChatCompletion, ChatMessage, ChatRole, OcrEngine, Synthesizer, Transcriber, UtterancePayload,
};
