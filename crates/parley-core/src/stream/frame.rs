use serde::{Serialize, Serializer};
use serde_json::Map;

use crate::models::{WireMessage, WireType};

/// Terminal frame of a successful run.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of a run's output sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Partial answer, partial reasoning or error, in wire message shape
    Message(WireMessage),
    /// Successful completion
    Done,
}

impl Frame {
    pub(crate) fn answer(run_id: &str, parent_id: Option<&str>, token: String) -> Self {
        Frame::Message(chunk(run_id, parent_id, WireType::AiChunk, token, None))
    }

    pub(crate) fn reasoning(run_id: &str, parent_id: Option<&str>, token: String) -> Self {
        Frame::Message(chunk(
            run_id,
            parent_id,
            WireType::AiChunk,
            String::new(),
            Some(token),
        ))
    }

    pub(crate) fn error(run_id: &str, parent_id: Option<&str>, message: impl std::fmt::Display) -> Self {
        Frame::Message(chunk(
            run_id,
            parent_id,
            WireType::Error,
            format!("An error occurred: {}", message),
            None,
        ))
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Frame::Done => true,
            Frame::Message(message) => message.message_type == WireType::Error,
        }
    }

    pub fn as_message(&self) -> Option<&WireMessage> {
        match self {
            Frame::Message(message) => Some(message),
            Frame::Done => None,
        }
    }

    /// Render as a server-sent event line (`data: ...`).
    pub fn to_data(&self) -> serde_json::Result<String> {
        match self {
            Frame::Message(message) => Ok(format!("data: {}", serde_json::to_string(message)?)),
            Frame::Done => Ok(format!("data: {}", DONE_SENTINEL)),
        }
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Frame::Message(message) => message.serialize(serializer),
            Frame::Done => serializer.serialize_str(DONE_SENTINEL),
        }
    }
}

fn chunk(
    run_id: &str,
    parent_id: Option<&str>,
    message_type: WireType,
    content: String,
    reasoning: Option<String>,
) -> WireMessage {
    WireMessage {
        id: Some(run_id.to_string()),
        parent_id: parent_id.map(str::to_string),
        from: "assistant".to_string(),
        sent_at: Some(chrono::Utc::now().timestamp_millis()),
        message_type,
        content,
        reasoning,
        additional_kwargs: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_serializes_as_literal() {
        assert_eq!(serde_json::to_string(&Frame::Done).unwrap(), "\"[DONE]\"");
        assert_eq!(Frame::Done.to_data().unwrap(), "data: [DONE]");
        assert!(Frame::Done.is_terminal());
    }

    #[test]
    fn test_answer_frame_shape() {
        let frame = Frame::answer("run-1", Some("user-1"), "Hel".to_string());
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["id"], "run-1");
        assert_eq!(json["parent_id"], "user-1");
        assert_eq!(json["type"], "AIMessageChunk");
        assert_eq!(json["from"], "assistant");
        assert_eq!(json["content"], "Hel");
        assert!(json["sent_at"].is_i64());
        assert!(json.get("reasoning").is_none());
        assert!(!frame.is_terminal());
    }

    #[test]
    fn test_reasoning_frame_keeps_content_empty() {
        let frame = Frame::reasoning("run-1", None, "think".to_string());
        let message = frame.as_message().unwrap();

        assert_eq!(message.content, "");
        assert_eq!(message.reasoning.as_deref(), Some("think"));
        assert!(message.parent_id.is_none());
    }

    #[test]
    fn test_error_frame() {
        let frame = Frame::error("run-1", Some("user-1"), "timeout");
        let message = frame.as_message().unwrap();

        assert_eq!(message.message_type, WireType::Error);
        assert_eq!(message.content, "An error occurred: timeout");
        assert!(frame.is_terminal());
        assert!(frame.to_data().unwrap().starts_with("data: {"));
    }
}
