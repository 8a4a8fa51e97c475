//! Chat model access: transcript types and the completions client

pub mod client;
pub mod types;

pub use client::{ChatModel, OpenAiChatModel};
pub use types::{ChatMessage, ContentPart, MessageContent, ModelTurn, Role, ToolCall, ToolSpec};
