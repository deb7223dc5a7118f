//! Chat history storage - byte-level API for per-session message logs.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;

const CHAT_HISTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chat_history");

/// Low-level chat history storage keyed by session id.
#[derive(Debug, Clone)]
pub struct ChatHistoryStorage {
    db: Arc<Database>,
}

impl ChatHistoryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CHAT_HISTORY_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store raw history data
    pub fn put_raw(&self, id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHAT_HISTORY_TABLE)?;
            table.insert(id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw history data by session ID
    pub fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_HISTORY_TABLE)?;

        if let Some(data) = table.get(id)? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Read, transform and write back one record inside a single write
    /// transaction.
    ///
    /// redb admits one write transaction at a time, so two concurrent updates
    /// of the same key are applied one after the other and neither is lost.
    /// If `update` fails the transaction is aborted and nothing is written.
    /// Returning `None` as the new value leaves the record untouched.
    pub fn update_raw<T, F>(&self, id: &str, update: F) -> Result<T>
    where
        F: FnOnce(Option<&[u8]>) -> Result<(Option<Vec<u8>>, T)>,
    {
        let write_txn = self.db.begin_write()?;
        let output = {
            let mut table = write_txn.open_table(CHAT_HISTORY_TABLE)?;
            let current = table.get(id)?.map(|data| data.value().to_vec());
            let (data, output) = update(current.as_deref())?;
            if let Some(data) = data {
                table.insert(id, data.as_slice())?;
            }
            output
        };
        write_txn.commit()?;
        Ok(output)
    }

    /// List all raw history data
    pub fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_HISTORY_TABLE)?;

        let mut histories = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            histories.push((key.value().to_string(), value.value().to_vec()));
        }

        Ok(histories)
    }

    /// Check if a history record exists
    pub fn exists(&self, id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_HISTORY_TABLE)?;
        Ok(table.get(id)?.is_some())
    }

    /// Count stored history records
    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_HISTORY_TABLE)?;
        Ok(table.len()? as usize)
    }

    /// Delete history by session ID
    pub fn delete(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CHAT_HISTORY_TABLE)?;
            table.remove(id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (ChatHistoryStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ChatHistoryStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_and_get_raw() {
        let (storage, _temp_dir) = setup();

        storage.put_raw("session-001", b"[]").unwrap();

        let retrieved = storage.get_raw("session-001").unwrap();
        assert_eq!(retrieved.as_deref(), Some(b"[]".as_slice()));
        assert!(storage.get_raw("session-404").unwrap().is_none());
    }

    #[test]
    fn test_update_raw_sees_current_value() {
        let (storage, _temp_dir) = setup();

        let first = storage
            .update_raw("session-001", |current| {
                assert!(current.is_none());
                Ok((Some(b"one".to_vec()), 1))
            })
            .unwrap();
        assert_eq!(first, 1);

        let second = storage
            .update_raw("session-001", |current| {
                let mut data = current.unwrap().to_vec();
                data.extend_from_slice(b",two");
                Ok((Some(data), 2))
            })
            .unwrap();
        assert_eq!(second, 2);
        assert_eq!(
            storage.get_raw("session-001").unwrap().unwrap(),
            b"one,two".to_vec()
        );
    }

    #[test]
    fn test_update_raw_error_aborts() {
        let (storage, _temp_dir) = setup();
        storage.put_raw("session-001", b"keep").unwrap();

        let result: Result<()> =
            storage.update_raw("session-001", |_| Err(anyhow::anyhow!("boom")));
        assert!(result.is_err());
        assert_eq!(
            storage.get_raw("session-001").unwrap().unwrap(),
            b"keep".to_vec()
        );
    }

    #[test]
    fn test_update_raw_without_value_writes_nothing() {
        let (storage, _temp_dir) = setup();

        let seen = storage
            .update_raw("session-001", |current| Ok((None, current.is_some())))
            .unwrap();
        assert!(!seen);
        assert!(!storage.exists("session-001").unwrap());
    }

    #[test]
    fn test_list_and_count() {
        let (storage, _temp_dir) = setup();

        storage.put_raw("session-001", b"data1").unwrap();
        storage.put_raw("session-002", b"data2").unwrap();

        assert_eq!(storage.list_raw().unwrap().len(), 2);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_exists_and_delete() {
        let (storage, _temp_dir) = setup();

        assert!(!storage.exists("session-001").unwrap());

        storage.put_raw("session-001", b"data").unwrap();
        assert!(storage.exists("session-001").unwrap());

        assert!(storage.delete("session-001").unwrap());
        assert!(!storage.exists("session-001").unwrap());
        assert!(!storage.delete("session-001").unwrap());
    }
}
