//! Message and conversation history types.
//!
//! These are the value objects the agent loop exchanges with the backend:
//! the history is replayed to the model every cycle and each cycle appends
//! the command result as a system message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The operator or the triggering prompt
    User,
    /// The model
    Assistant,
    /// System instructions and command results
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// Append-only, ordered conversation history.
///
/// There is deliberately no way to insert, remove or reorder entries:
/// the only mutation is [`History::push`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_system_message() {
        let msg = Message::system("Command ls returned: a b");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "Command ls returned: a b");
    }

    #[test]
    fn history_appends_in_order() {
        let mut history = History::new();
        history.push(Message::user("first"));
        history.push(Message::assistant("second"));
        history.push(Message::system("third"));

        let contents: Vec<_> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(history.last().map(|m| m.role), Some(Role::System));
    }

    #[test]
    fn history_serializes_as_plain_list() {
        let mut history = History::new();
        history.push(Message::user("hello"));
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "user");
    }

    #[test]
    fn history_token_estimate() {
        let mut history = History::new();
        // 20 chars ≈ 5 tokens
        history.push(Message::user("12345678901234567890"));
        assert_eq!(history.estimated_tokens(), 5);
    }
}
