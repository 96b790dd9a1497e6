//! 记忆层：对话消息与有界历史

pub mod conversation;

pub use conversation::{ConversationHistory, Message, Role, ToolCall, DEFAULT_MAX_HISTORY};
