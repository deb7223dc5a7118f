//! Conversation message variants and their persisted (enriched) form.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Kind of a non-text message part
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Text,
    Image,
    Audio,
    Video,
    Pdf,
}

impl PartKind {
    /// Key used for this kind in the wire `artifacts` map
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Text => "text",
            PartKind::Image => "image",
            PartKind::Audio => "audio",
            PartKind::Video => "video",
            PartKind::Pdf => "pdf",
        }
    }
}

/// Structured message content carried next to the primary text.
///
/// Binary parts keep their payload inline as base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub kind: PartKind,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: PartKind::Text,
            data: text.into(),
            mime_type: None,
        }
    }

    /// Binary part from already-encoded base64 data.
    pub fn encoded(kind: PartKind, base64_data: impl Into<String>) -> Self {
        Self {
            kind,
            data: base64_data.into(),
            mime_type: None,
        }
    }

    /// Binary part from raw bytes.
    pub fn from_bytes(kind: PartKind, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            kind,
            data: STANDARD.encode(bytes),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn image(base64_data: impl Into<String>) -> Self {
        Self::encoded(PartKind::Image, base64_data)
    }
}

/// Tool invocation requested by the assistant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemMessage {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    pub content: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultMessage {
    /// Correlation id of the tool call this result answers
    pub id: String,
    pub tool_name: String,
    pub content: String,
}

/// Payload wrapped by a stored message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredPayload {
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResult(ToolResultMessage),
}

impl StoredPayload {
    pub fn content(&self) -> &str {
        match self {
            StoredPayload::User(m) => &m.content,
            StoredPayload::Assistant(m) => &m.content,
            StoredPayload::ToolResult(m) => &m.content,
        }
    }

    /// Strip the enrichment back off into a bare conversational message
    pub fn into_message(self) -> ChatMessage {
        match self {
            StoredPayload::User(m) => ChatMessage::User(m),
            StoredPayload::Assistant(m) => ChatMessage::Assistant(m),
            StoredPayload::ToolResult(m) => ChatMessage::ToolResult(m),
        }
    }
}

/// Persisted message enriched with identity, causal parent and send time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Epoch milliseconds
    pub sent_at: i64,
    pub message: StoredPayload,
}

impl StoredMessage {
    pub fn is_user(&self) -> bool {
        matches!(self.message, StoredPayload::User(_))
    }
}

/// A conversation message.
///
/// `Stored` only appears in persisted logs; every other variant is the
/// transient shape exchanged with the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResult(ToolResultMessage),
    Stored(StoredMessage),
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System(SystemMessage {
            content: content.into(),
        })
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User(UserMessage {
            content: content.into(),
            parts: Vec::new(),
        })
    }

    pub fn user_with_parts(content: impl Into<String>, parts: Vec<Part>) -> Self {
        ChatMessage::User(UserMessage {
            content: content.into(),
            parts,
        })
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant(AssistantMessage {
            content: content.into(),
            reasoning: String::new(),
            tool_calls: Vec::new(),
        })
    }

    pub fn assistant_with_reasoning(
        content: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        ChatMessage::Assistant(AssistantMessage {
            content: content.into(),
            reasoning: reasoning.into(),
            tool_calls: Vec::new(),
        })
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        ChatMessage::Assistant(AssistantMessage {
            content: content.into(),
            reasoning: String::new(),
            tool_calls,
        })
    }

    pub fn tool_result(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        ChatMessage::ToolResult(ToolResultMessage {
            id: id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
        })
    }

    /// Primary text of the message, looking through stored wrappers
    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System(m) => &m.content,
            ChatMessage::User(m) => &m.content,
            ChatMessage::Assistant(m) => &m.content,
            ChatMessage::ToolResult(m) => &m.content,
            ChatMessage::Stored(m) => m.message.content(),
        }
    }

    /// Variant name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ChatMessage::System(_) => "system",
            ChatMessage::User(_) => "user",
            ChatMessage::Assistant(_) => "assistant",
            ChatMessage::ToolResult(_) => "tool_result",
            ChatMessage::Stored(_) => "stored",
        }
    }

    /// Unwrap a stored message into the bare form the model expects.
    pub fn unwrap_stored(self) -> ChatMessage {
        match self {
            ChatMessage::Stored(stored) => stored.message.into_message(),
            other => other,
        }
    }

    pub fn as_stored(&self) -> Option<&StoredMessage> {
        match self {
            ChatMessage::Stored(stored) => Some(stored),
            _ => None,
        }
    }
}
