//! Storage layer with typed wrappers around parley-storage.
//!
//! This module provides type-safe access to the storage layer by wrapping
//! the byte-level APIs from parley-storage with Rust types from our models.

pub mod chat_history;

use crate::error::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use chat_history::ChatHistoryStorage;

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    pub chat_history: ChatHistoryStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path.as_ref()).map_err(anyhow::Error::from)?);
        let chat_history = ChatHistoryStorage::new(db)?;

        Ok(Self { chat_history })
    }
}
