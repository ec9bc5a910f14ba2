//! Conversation engine and call-session controller
//!
//! `ConversationEngine` keeps the transcript and talks to the
//! chat-completion collaborator; `CallSession` is the top-level state
//! machine sequencing capture → VAD → recording → transcription →
//! completion → synthesis and exposing mute/hang-up/duration controls.

pub mod call;
pub mod engine;

pub use call::{CallConfig, CallEvent, CallSession, CallSnapshot, CallStatus};
pub use engine::ConversationEngine;
