//! Conversation engine
//!
//! Owns the transcript history for one session and produces agent replies
//! through the chat-completion collaborator. Turns are appended strictly in
//! completion order: the agent reply to a user turn lands immediately after
//! it, and a failed completion leaves the history with the user turn only.

use parking_lot::Mutex;
use std::sync::Arc;

use bima_core::{ChatCompletion, Language, Result, TranscriptHistory, Turn};
use bima_llm::PromptBuilder;

/// Maintains message history and calls the chat-completion collaborator
pub struct ConversationEngine {
    history: Mutex<TranscriptHistory>,
    backend: Arc<dyn ChatCompletion>,
    prompt: PromptBuilder,
}

impl ConversationEngine {
    pub fn new(language: Language, backend: Arc<dyn ChatCompletion>) -> Self {
        Self {
            history: Mutex::new(TranscriptHistory::new()),
            backend,
            prompt: PromptBuilder::new(language),
        }
    }

    pub fn language(&self) -> Language {
        self.prompt.language()
    }

    /// Append the localized greeting as the opening agent turn
    pub fn greet(&self) -> Turn {
        self.history
            .lock()
            .push_agent(self.language().greeting())
    }

    /// Append a user turn without requesting a reply
    pub fn push_user(&self, text: &str) -> Turn {
        self.history.lock().push_user(text)
    }

    /// Append an agent turn
    pub fn push_agent(&self, text: &str) -> Turn {
        self.history.lock().push_agent(text)
    }

    /// Ask the collaborator for a reply to the current history
    ///
    /// Does not mutate the transcript; callers append the agent turn once
    /// they have decided the result is still wanted (the call controller
    /// discards results that resolve after hang-up).
    pub async fn complete(&self) -> Result<String> {
        let messages = self.history.lock().to_messages();
        self.backend.complete(self.prompt.system(), &messages).await
    }

    /// Full round-trip for the text-chat surface: append the user turn,
    /// get a reply, append it. On failure the user turn remains and no
    /// agent turn is added.
    pub async fn reply(&self, user_text: &str) -> Result<Turn> {
        self.push_user(user_text);
        let text = self.complete().await?;
        Ok(self.push_agent(&text))
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.history.lock().turns().to_vec()
    }

    pub fn turn_count(&self) -> usize {
        self.history.lock().len()
    }

    /// Reset the transcript for a fresh session
    pub fn clear(&self) {
        self.history.lock().clear();
    }
}
