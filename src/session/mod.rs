pub mod history;
pub mod message;

pub use history::ConversationHistory;
pub use message::{Message, MessageRole};
