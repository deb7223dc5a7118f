//! Parley Storage - Low-level storage abstraction layer
//!
//! This crate provides the persistence layer for Parley, using redb as the
//! embedded database. It exposes byte-level APIs so that the message models
//! living in parley-core stay out of the storage layer.
//!
//! # Tables
//!
//! - `chat_history` - Per-session serialized message logs

pub mod chat_history;
pub mod paths;

pub use chat_history::ChatHistoryStorage;
