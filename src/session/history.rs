use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// The ordered, append-only record of one agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    /// Unique identifier for the run this history belongs to
    pub id: String,
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Creates an empty history with a fresh run identifier.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    /// Appends a message to the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the history.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageRole;

    #[test]
    fn history_preserves_append_order() {
        let mut history = ConversationHistory::new();
        history.push(Message::new_system("rules"));
        history.push(Message::new_user("generate this month's report"));
        history.push(Message::new_assistant(r#"{"tool_code":{"tool":"get_today","args":{}}}"#));
        history.push(Message::new_tool_feedback("Tool get_today executed successfully."));

        let roles: Vec<MessageRole> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool
            ]
        );
        assert_eq!(history.len(), 4);
        assert!(history.last().is_some_and(|m| m.text.contains("get_today")));
    }

    #[test]
    fn each_history_gets_its_own_id() {
        assert_ne!(ConversationHistory::new().id, ConversationHistory::new().id);
    }
}
