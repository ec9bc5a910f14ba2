//! Conversation types: turns and the transcript history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::{ChatMessage, ChatRole};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The caller
    User,
    /// The insurance agent
    Agent,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
///
/// Turns are immutable once created. Ids are allocated monotonically by the
/// owning [`TranscriptHistory`], so insertion order is conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Session-unique, monotonically increasing id
    pub id: u64,
    /// Who spoke
    pub speaker: Speaker,
    /// Utterance content
    pub text: String,
    /// When the turn was created
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(id: u64, speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            id,
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Append-only transcript of one call or chat session
///
/// Owns turn id allocation. Cleared as a whole when the session resets;
/// individual turns are never mutated or removed.
#[derive(Debug, Default)]
pub struct TranscriptHistory {
    turns: Vec<Turn>,
    next_id: u64,
}

impl TranscriptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn, returning a clone of it
    pub fn push_user(&mut self, text: impl Into<String>) -> Turn {
        self.push(Speaker::User, text)
    }

    /// Append an agent turn, returning a clone of it
    pub fn push_agent(&mut self, text: impl Into<String>) -> Turn {
        self.push(Speaker::Agent, text)
    }

    fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> Turn {
        let turn = Turn::new(self.next_id, speaker, text);
        self.next_id += 1;
        self.turns.push(turn.clone());
        turn
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Reset for a fresh session; id allocation restarts at zero
    pub fn clear(&mut self) {
        self.turns.clear();
        self.next_id = 0;
    }

    /// Project the history into chat-completion messages
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| ChatMessage {
                role: match turn.speaker {
                    Speaker::User => ChatRole::User,
                    Speaker::Agent => ChatRole::Assistant,
                },
                content: turn.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_ordering_and_ids() {
        let mut history = TranscriptHistory::new();
        let first = history.push_agent("Hello!");
        let second = history.push_user("Hi");
        let third = history.push_agent("How can I help?");

        assert!(first.id < second.id && second.id < third.id);
        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[0].speaker, Speaker::Agent);
        assert_eq!(history.turns()[1].speaker, Speaker::User);
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut history = TranscriptHistory::new();
        history.push_user("one");
        history.push_user("two");
        history.clear();

        assert!(history.is_empty());
        let turn = history.push_user("again");
        assert_eq!(turn.id, 0);
    }

    #[test]
    fn test_to_messages_roles() {
        let mut history = TranscriptHistory::new();
        history.push_agent("Namaste!");
        history.push_user("What is PMFBY?");

        let messages = history.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "What is PMFBY?");
    }
}
