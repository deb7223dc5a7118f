pub mod chat_history;
pub mod message;
pub mod wire;

pub use chat_history::{ChatHistory, LogEntry};
pub use message::{
    AssistantMessage, ChatMessage, Part, PartKind, StoredMessage, StoredPayload, SystemMessage,
    ToolCall, ToolResultMessage, UserMessage,
};
pub use wire::{WireMessage, WireType};
