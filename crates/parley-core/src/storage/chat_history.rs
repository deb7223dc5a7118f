//! Typed chat history storage wrapper.
//!
//! Provides type-safe access to chat history storage, wrapping the byte-level
//! API from parley-storage with our Rust models.

use crate::error::{MemoryError, Result};
use crate::models::ChatHistory;
use redb::Database;
use std::sync::Arc;

/// Typed chat history storage wrapper around parley_storage::ChatHistoryStorage.
///
/// Histories are stored as JSON. Payloads that fail to decode surface as
/// [`MemoryError::CorruptHistory`] and are never rewritten.
#[derive(Debug, Clone)]
pub struct ChatHistoryStorage {
    inner: parley_storage::ChatHistoryStorage,
}

impl ChatHistoryStorage {
    /// Create a new chat history storage instance.
    pub fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            inner: parley_storage::ChatHistoryStorage::new(db)?,
        })
    }

    /// Get a history by session ID, including archived ones.
    pub fn get(&self, id: &str) -> Result<Option<ChatHistory>> {
        match self.inner.get_raw(id)? {
            Some(bytes) => Ok(Some(decode(id, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a history unless it is missing or archived.
    pub fn get_active(&self, id: &str) -> Result<Option<ChatHistory>> {
        Ok(self.get(id)?.filter(|history| !history.archived))
    }

    /// Apply `update` to the active history of a session and persist it.
    ///
    /// The current record is re-read inside the same write transaction. A
    /// missing or archived record is replaced by a fresh empty history.
    pub fn update<T, F>(&self, id: &str, update: F) -> Result<T>
    where
        F: FnOnce(&mut ChatHistory) -> T,
    {
        self.inner
            .update_raw(id, |current| {
                let mut history = match current {
                    Some(bytes) => decode(id, bytes)?,
                    None => ChatHistory::new(id),
                };
                if history.archived {
                    history = ChatHistory::new(id);
                }

                let output = update(&mut history);
                let json = serde_json::to_vec(&history)?;
                Ok((Some(json), output))
            })
            .map_err(into_memory_error)
    }

    /// Save a history (create or overwrite).
    pub fn save(&self, history: &ChatHistory) -> Result<()> {
        let json = serde_json::to_vec(history).map_err(anyhow::Error::from)?;
        Ok(self.inner.put_raw(&history.id, &json)?)
    }

    /// List active histories.
    ///
    /// Returns histories sorted by updated_at descending (most recent first).
    /// Corrupt records are skipped with a warning so one bad session does not
    /// hide the others.
    pub fn list_active(&self) -> Result<Vec<ChatHistory>> {
        let mut histories = Vec::new();
        for (id, bytes) in self.inner.list_raw()? {
            match decode(&id, &bytes) {
                Ok(history) if !history.archived => histories.push(history),
                Ok(_) => {}
                Err(e) => tracing::warn!(session_id = %id, error = %e, "Skipping corrupt history"),
            }
        }

        histories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(histories)
    }

    /// Mark a history archived. Returns false when there was nothing to archive.
    ///
    /// The flag is set inside one write transaction, so an append racing the
    /// archive is either archived with it or lands in a fresh log afterwards.
    pub fn archive(&self, id: &str) -> Result<bool> {
        self.inner
            .update_raw(id, |current| {
                let Some(bytes) = current else {
                    return Ok((None, false));
                };
                let mut history = decode(id, bytes)?;
                if history.archived {
                    return Ok((None, false));
                }

                history.archived = true;
                history.updated_at = chrono::Utc::now().timestamp_millis();
                Ok((Some(serde_json::to_vec(&history)?), true))
            })
            .map_err(into_memory_error)
    }

    /// Remove a history record entirely.
    pub fn purge(&self, id: &str) -> Result<bool> {
        Ok(self.inner.delete(id)?)
    }

    /// Check if a history record exists (archived or not).
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.inner.exists(id)?)
    }

    /// Count stored history records.
    pub fn count(&self) -> Result<usize> {
        Ok(self.inner.count()?)
    }
}

fn decode(id: &str, bytes: &[u8]) -> Result<ChatHistory> {
    serde_json::from_slice(bytes).map_err(|source| MemoryError::CorruptHistory {
        session_id: id.to_string(),
        source,
    })
}

fn into_memory_error(err: anyhow::Error) -> MemoryError {
    match err.downcast::<MemoryError>() {
        Ok(memory_error) => memory_error,
        Err(other) => MemoryError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use tempfile::tempdir;

    fn setup() -> (ChatHistoryStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ChatHistoryStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_update_creates_history_lazily() {
        let (storage, _temp_dir) = setup();
        assert!(storage.get("s-1").unwrap().is_none());

        let len = storage
            .update("s-1", |history| {
                history.push(ChatMessage::user("hi"));
                history.messages.len()
            })
            .unwrap();
        assert_eq!(len, 1);

        let history = storage.get_active("s-1").unwrap().unwrap();
        assert_eq!(history.id, "s-1");
        assert_eq!(history.messages.len(), 1);
    }

    #[test]
    fn test_corrupt_payload_is_surfaced() {
        let (storage, _temp_dir) = setup();
        storage.inner.put_raw("s-1", b"{not json").unwrap();

        let err = storage.get("s-1").unwrap_err();
        assert!(matches!(err, MemoryError::CorruptHistory { ref session_id, .. } if session_id == "s-1"));

        let err = storage.update("s-1", |_| ()).unwrap_err();
        assert!(matches!(err, MemoryError::CorruptHistory { .. }));
        assert_eq!(storage.inner.get_raw("s-1").unwrap().unwrap(), b"{not json".to_vec());
    }

    #[test]
    fn test_archive_hides_history() {
        let (storage, _temp_dir) = setup();
        storage
            .update("s-1", |history| history.push(ChatMessage::user("hi")))
            .unwrap();

        assert!(storage.archive("s-1").unwrap());
        assert!(!storage.archive("s-1").unwrap());
        assert!(!storage.archive("missing").unwrap());

        assert!(storage.get_active("s-1").unwrap().is_none());
        assert!(storage.get("s-1").unwrap().unwrap().archived);
        assert!(storage.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_archive_keeps_messages_and_rejects_corrupt() {
        let (storage, _temp_dir) = setup();
        storage
            .update("s-1", |history| {
                history.push(ChatMessage::user("one"));
                history.push(ChatMessage::user("two"));
            })
            .unwrap();

        assert!(storage.archive("s-1").unwrap());
        let archived = storage.get("s-1").unwrap().unwrap();
        assert!(archived.archived);
        assert_eq!(archived.messages.len(), 2);

        storage.inner.put_raw("s-bad", b"{not json").unwrap();
        assert!(matches!(
            storage.archive("s-bad").unwrap_err(),
            MemoryError::CorruptHistory { .. }
        ));
        assert!(!storage.archive("missing").unwrap());
        assert!(!storage.exists("missing").unwrap());
    }

    #[test]
    fn test_update_after_archive_starts_fresh() {
        let (storage, _temp_dir) = setup();
        storage
            .update("s-1", |history| history.push(ChatMessage::user("old")))
            .unwrap();
        storage.archive("s-1").unwrap();

        storage
            .update("s-1", |history| history.push(ChatMessage::user("new")))
            .unwrap();

        let history = storage.get_active("s-1").unwrap().unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].as_message().unwrap().content(), "new");
    }

    #[test]
    fn test_list_active_sorted_and_skips_corrupt() {
        let (storage, _temp_dir) = setup();

        let mut older = ChatHistory::new("s-old");
        older.updated_at = 1000;
        let mut newer = ChatHistory::new("s-new");
        newer.updated_at = 3000;
        storage.save(&older).unwrap();
        storage.save(&newer).unwrap();
        storage.inner.put_raw("s-bad", b"garbage").unwrap();

        let histories = storage.list_active().unwrap();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[0].id, "s-new");
        assert_eq!(histories[1].id, "s-old");
    }

    #[test]
    fn test_purge_removes_record() {
        let (storage, _temp_dir) = setup();
        storage.save(&ChatHistory::new("s-1")).unwrap();
        assert_eq!(storage.count().unwrap(), 1);

        assert!(storage.purge("s-1").unwrap());
        assert!(!storage.purge("s-1").unwrap());
        assert!(!storage.exists("s-1").unwrap());
    }
}
