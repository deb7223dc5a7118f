//! Conversation memory store.
//!
//! Keeps one append-only message log per session. Each append enriches the
//! newest message with an id, a send time and the id of the user message it
//! answers, resolved from the persisted log alone so the store carries no
//! state between calls.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChatHistory, ChatMessage, LogEntry, StoredMessage, StoredPayload, WireMessage};
use crate::storage::ChatHistoryStorage;

/// Default number of messages exposed to the generation service.
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Summary of an active session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub updated_at: i64,
}

/// Per-session persisted message log
#[derive(Debug, Clone)]
pub struct MemoryStore {
    storage: ChatHistoryStorage,
    max_messages: usize,
}

impl MemoryStore {
    pub fn new(storage: ChatHistoryStorage) -> Self {
        Self {
            storage,
            max_messages: DEFAULT_CONTEXT_WINDOW,
        }
    }

    pub fn with_context_window(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    pub fn context_window(&self) -> usize {
        self.max_messages
    }

    /// Persisted log of a session; empty for unknown or deleted sessions.
    pub fn read(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let Some(history) = self.storage.get_active(session_id)? else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::with_capacity(history.messages.len());
        for entry in history.messages {
            match entry {
                LogEntry::Message(message) => messages.push(message),
                LogEntry::Unsupported(_) => {
                    warn!(session_id, "Skipping unsupported entry in chat history")
                }
            }
        }
        Ok(messages)
    }

    /// Enrich `message` and append it to the session log.
    ///
    /// Returns the message in the form it was persisted.
    pub fn append(&self, session_id: &str, message: ChatMessage) -> Result<ChatMessage> {
        let stored = self.storage.update(session_id, |history| {
            let enriched = enrich(message, history);
            history.push(enriched.clone());
            enriched
        })?;

        debug!(
            session_id,
            kind = stored.kind(),
            id = stored.as_stored().map(|m| m.id.as_str()),
            "Appended message to chat history"
        );
        Ok(stored)
    }

    /// Delete a session's log. Deleting an absent session is a no-op.
    pub fn delete(&self, session_id: &str) -> Result<()> {
        if self.storage.archive(session_id)? {
            debug!(session_id, "Archived chat history");
        }
        Ok(())
    }

    /// Remove a session's record from storage entirely.
    pub fn purge(&self, session_id: &str) -> Result<()> {
        if self.storage.purge(session_id)? {
            debug!(session_id, "Purged chat history");
        }
        Ok(())
    }

    /// Enriched wire projection of the full session log.
    pub fn history(&self, session_id: &str) -> Result<Vec<WireMessage>> {
        let Some(history) = self.storage.get_active(session_id)? else {
            return Ok(Vec::new());
        };
        Ok(history.messages.iter().filter_map(LogEntry::to_wire).collect())
    }

    /// Model-ready context: the most recent messages with enrichment stripped.
    ///
    /// A window never opens on a tool result whose call fell outside it.
    pub fn context(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.read(session_id)?;
        let start = messages.len().saturating_sub(self.max_messages);

        let window: Vec<ChatMessage> = messages
            .into_iter()
            .skip(start)
            .map(ChatMessage::unwrap_stored)
            .skip_while(|m| matches!(m, ChatMessage::ToolResult(_)))
            .collect();
        Ok(window)
    }

    /// Active sessions, most recently updated first.
    pub fn sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self
            .storage
            .list_active()?
            .into_iter()
            .map(|history| SessionSummary {
                message_count: history.known_messages().count(),
                id: history.id,
                updated_at: history.updated_at,
            })
            .collect())
    }
}

/// Attach identity, send time and causal parent to a new message.
fn enrich(message: ChatMessage, history: &ChatHistory) -> ChatMessage {
    let now = chrono::Utc::now().timestamp_millis();
    match message {
        ChatMessage::User(user) => ChatMessage::Stored(StoredMessage {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            sent_at: now,
            message: StoredPayload::User(user),
        }),
        ChatMessage::Assistant(assistant) => ChatMessage::Stored(StoredMessage {
            id: Uuid::new_v4().to_string(),
            parent_id: history.last_user_message_id().map(str::to_string),
            sent_at: now,
            message: StoredPayload::Assistant(assistant),
        }),
        ChatMessage::ToolResult(result) => ChatMessage::Stored(StoredMessage {
            id: result.id.clone(),
            parent_id: history.last_user_message_id().map(str::to_string),
            sent_at: now,
            message: StoredPayload::ToolResult(result),
        }),
        // Ids are assigned once; already-enriched and system messages pass through.
        ChatMessage::System(_) | ChatMessage::Stored(_) => message,
    }
}
