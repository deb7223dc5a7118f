//! Conversation memory: per-session message logs and model context.

mod store;

pub use store::{DEFAULT_CONTEXT_WINDOW, MemoryStore, SessionSummary};
