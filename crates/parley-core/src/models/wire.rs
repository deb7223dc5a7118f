//! Client-facing projection of conversation messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::message::{
    AssistantMessage, ChatMessage, StoredPayload, SystemMessage, ToolResultMessage, UserMessage,
};

/// Wire discriminator for messages and stream frames
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WireType {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "tool")]
    Tool,
    #[serde(rename = "AIMessageChunk")]
    AiChunk,
    #[serde(rename = "error")]
    Error,
}

/// Message as exposed to API and history consumers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub from: String,
    /// Epoch milliseconds
    pub sent_at: Option<i64>,
    #[serde(rename = "type")]
    pub message_type: WireType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub additional_kwargs: Map<String, Value>,
}

struct Envelope {
    id: Option<String>,
    parent_id: Option<String>,
    sent_at: Option<i64>,
}

impl Envelope {
    const BARE: Envelope = Envelope {
        id: None,
        parent_id: None,
        sent_at: None,
    };
}

impl ChatMessage {
    /// Project this message into its client-facing wire shape.
    pub fn to_wire(&self) -> WireMessage {
        match self {
            ChatMessage::System(m) => system_to_wire(m),
            ChatMessage::User(m) => user_to_wire(m, Envelope::BARE),
            ChatMessage::Assistant(m) => assistant_to_wire(m, Envelope::BARE),
            ChatMessage::ToolResult(m) => tool_result_to_wire(m, None, None),
            ChatMessage::Stored(stored) => {
                let envelope = Envelope {
                    id: Some(stored.id.clone()),
                    parent_id: stored.parent_id.clone(),
                    sent_at: Some(stored.sent_at),
                };
                match &stored.message {
                    StoredPayload::User(m) => user_to_wire(m, envelope),
                    StoredPayload::Assistant(m) => assistant_to_wire(m, envelope),
                    StoredPayload::ToolResult(m) => {
                        tool_result_to_wire(m, envelope.parent_id, envelope.sent_at)
                    }
                }
            }
        }
    }
}

fn system_to_wire(message: &SystemMessage) -> WireMessage {
    WireMessage {
        id: None,
        parent_id: None,
        from: "system".to_string(),
        sent_at: None,
        message_type: WireType::System,
        content: message.content.clone(),
        reasoning: None,
        additional_kwargs: Map::new(),
    }
}

fn user_to_wire(message: &UserMessage, envelope: Envelope) -> WireMessage {
    // Primary text first so that an explicit text part wins on collision.
    let mut artifacts = Map::new();
    if !message.content.is_empty() {
        artifacts.insert("text".to_string(), Value::String(message.content.clone()));
    }
    for part in &message.parts {
        artifacts.insert(part.kind.as_str().to_string(), Value::String(part.data.clone()));
    }

    let mut additional_kwargs = Map::new();
    additional_kwargs.insert("artifacts".to_string(), Value::Object(artifacts));

    WireMessage {
        id: envelope.id,
        parent_id: envelope.parent_id,
        from: "user".to_string(),
        sent_at: envelope.sent_at,
        message_type: WireType::Human,
        content: message.content.clone(),
        reasoning: None,
        additional_kwargs,
    }
}

fn assistant_to_wire(message: &AssistantMessage, envelope: Envelope) -> WireMessage {
    let tool_calls: Vec<Value> = message
        .tool_calls
        .iter()
        .map(|call| {
            json!({
                "id": call.id,
                "name": call.name,
                "arguments": call.arguments,
            })
        })
        .collect();

    let mut additional_kwargs = Map::new();
    additional_kwargs.insert("tool_calls".to_string(), Value::Array(tool_calls));

    WireMessage {
        id: envelope.id,
        parent_id: envelope.parent_id,
        from: "assistant".to_string(),
        sent_at: envelope.sent_at,
        message_type: WireType::Ai,
        content: message.content.clone(),
        reasoning: (!message.reasoning.is_empty()).then(|| message.reasoning.clone()),
        additional_kwargs,
    }
}

fn tool_result_to_wire(
    message: &ToolResultMessage,
    parent_id: Option<String>,
    sent_at: Option<i64>,
) -> WireMessage {
    let mut additional_kwargs = Map::new();
    additional_kwargs.insert(
        "toolName".to_string(),
        Value::String(message.tool_name.clone()),
    );

    WireMessage {
        id: Some(message.id.clone()),
        parent_id,
        from: "tool".to_string(),
        sent_at,
        message_type: WireType::Tool,
        content: message.content.clone(),
        reasoning: None,
        additional_kwargs,
    }
}
