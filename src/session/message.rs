use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents one turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: String,
    /// The role of the message sender
    pub role: MessageRole,
    /// The text payload of the turn
    pub text: String,
    /// Timestamp when the message was created
    pub created_at: DateTime<Utc>,
}

/// The role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction (tool catalog and scenario rules)
    System,
    /// User-facing input
    User,
    /// Planner output (a recorded tool-call decision)
    Assistant,
    /// Feedback about a tool execution
    Tool,
}

impl Message {
    fn with_role(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a new system message.
    pub fn new_system(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, text)
    }

    /// Creates a new user message.
    pub fn new_user(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, text)
    }

    /// Creates a new planner-output message.
    pub fn new_assistant(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, text)
    }

    /// Creates a new tool-feedback message.
    pub fn new_tool_feedback(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Tool, text)
    }
}
