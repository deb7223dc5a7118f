//! Persisted per-session chat history record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::message::ChatMessage;
use super::wire::WireMessage;

/// `type` discriminators of [`ChatMessage`] variants.
const KNOWN_TYPES: [&str; 5] = ["system", "user", "assistant", "tool_result", "stored"];

/// One entry of a persisted message log.
///
/// Entries whose `type` is not a known variant (written by a newer build, or
/// by hand) are carried through rewrites untouched so the log stays
/// append-only, and are skipped by every projection. An entry that claims a
/// known variant but does not match its shape fails the whole decode.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum LogEntry {
    Message(ChatMessage),
    Unsupported(Value),
}

impl LogEntry {
    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            LogEntry::Message(message) => Some(message),
            LogEntry::Unsupported(_) => None,
        }
    }

    /// Wire projection; unsupported entries are logged and yield nothing.
    pub fn to_wire(&self) -> Option<WireMessage> {
        match self {
            LogEntry::Message(message) => Some(message.to_wire()),
            LogEntry::Unsupported(value) => {
                let entry_type = value.get("type").and_then(|t| t.as_str()).unwrap_or("unknown");
                tracing::warn!(entry_type, "Skipping unsupported message variant");
                None
            }
        }
    }
}

impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let known = value
            .get("type")
            .and_then(|t| t.as_str())
            .is_some_and(|t| KNOWN_TYPES.contains(&t));

        if known {
            serde_json::from_value(value)
                .map(LogEntry::Message)
                .map_err(serde::de::Error::custom)
        } else {
            Ok(LogEntry::Unsupported(value))
        }
    }
}

impl From<ChatMessage> for LogEntry {
    fn from(message: ChatMessage) -> Self {
        LogEntry::Message(message)
    }
}

/// Chat history of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<LogEntry>,
    /// Soft-delete marker; archived histories are invisible to reads
    #[serde(default)]
    pub archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatHistory {
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            messages: Vec::new(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
        self.messages.push(LogEntry::Message(message));
    }

    /// Known messages in log order
    pub fn known_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter_map(LogEntry::as_message)
    }

    /// Id of the most recent stored user message, scanning backward.
    pub fn last_user_message_id(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter_map(LogEntry::as_message)
            .filter_map(ChatMessage::as_stored)
            .find(|stored| stored.is_user())
            .map(|stored| stored.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::{StoredMessage, StoredPayload, UserMessage};

    fn stored_user(id: &str) -> ChatMessage {
        ChatMessage::Stored(StoredMessage {
            id: id.to_string(),
            parent_id: None,
            sent_at: 1,
            message: StoredPayload::User(UserMessage {
                content: id.to_string(),
                parts: Vec::new(),
            }),
        })
    }

    #[test]
    fn test_unknown_entry_survives_round_trip() {
        let raw = r#"{
            "id": "s-1",
            "messages": [
                {"type": "voice_note", "seconds": 3},
                {"type": "user", "content": "hi"}
            ],
            "created_at": 1,
            "updated_at": 2
        }"#;

        let history: ChatHistory = serde_json::from_str(raw).unwrap();
        assert!(!history.archived);
        assert!(matches!(history.messages[0], LogEntry::Unsupported(_)));
        assert!(matches!(history.messages[1], LogEntry::Message(_)));
        assert!(history.messages[0].to_wire().is_none());

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["messages"][0]["type"], "voice_note");
        assert_eq!(json["messages"][0]["seconds"], 3);
    }

    #[test]
    fn test_known_type_with_bad_shape_fails_decode() {
        let raw = r#"{
            "id": "s-1",
            "messages": [
                {"type": "stored", "id": "u-1", "sent_at": 1, "message": {"kind": "user"}}
            ],
            "created_at": 1,
            "updated_at": 2
        }"#;

        assert!(serde_json::from_str::<ChatHistory>(raw).is_err());
    }

    #[test]
    fn test_every_variant_tag_is_known() {
        let messages = [
            ChatMessage::system("s"),
            ChatMessage::user("u"),
            ChatMessage::assistant("a"),
            ChatMessage::tool_result("c", "t", "r"),
            stored_user("u-1"),
        ];
        for message in messages {
            let json = serde_json::to_value(&message).unwrap();
            let tag = json["type"].as_str().unwrap();
            assert!(KNOWN_TYPES.contains(&tag), "{tag} missing");
            let entry: LogEntry = serde_json::from_value(json).unwrap();
            assert_eq!(entry, LogEntry::Message(message));
        }
    }

    #[test]
    fn test_last_user_message_id_scans_backward() {
        let mut history = ChatHistory::new("s-1");
        assert!(history.last_user_message_id().is_none());

        history.push(stored_user("u-1"));
        history.push(ChatMessage::system("be brief"));
        history.push(stored_user("u-2"));
        history.push(ChatMessage::assistant("bare"));

        assert_eq!(history.last_user_message_id(), Some("u-2"));
    }
}
