//! Parley core: conversation memory and streaming event bridge.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod models;
pub mod storage;
pub mod stream;

pub use chat::{ChatCompletion, ChatReply, ChatService};
pub use config::ParleyConfig;
pub use error::{GenerationError, MemoryError, Result};
pub use memory::MemoryStore;
pub use models::*;
pub use stream::{Frame, FrameStream, RunOutcome, RunState, StreamBridge};

use std::path::Path;
use std::sync::Arc;

use llm::GenerationService;
use storage::Storage;
use tracing::info;

/// Core application state shared by the binary and embedders
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub memory: MemoryStore,
    pub chat: ChatService,
    pub config: ParleyConfig,
}

impl AppCore {
    /// Open the configured database and wire the chat service.
    pub fn new(config: ParleyConfig, generator: Arc<dyn GenerationService>) -> Result<Self> {
        let db_path = config.database_path()?;
        Self::with_db_path(db_path, config, generator)
    }

    pub fn with_db_path(
        db_path: impl AsRef<Path>,
        config: ParleyConfig,
        generator: Arc<dyn GenerationService>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::new(db_path.as_ref())?);
        let memory = MemoryStore::new(storage.chat_history.clone())
            .with_context_window(config.memory.max_messages);
        let chat = ChatService::new(
            memory.clone(),
            generator.clone(),
            StreamBridge::new(config.stream.buffer_size),
            config.llm.clone(),
        );

        info!(
            db_path = %db_path.as_ref().display(),
            provider = generator.provider(),
            model = generator.model(),
            "Initializing Parley"
        );

        Ok(Self {
            storage,
            memory,
            chat,
            config,
        })
    }
}
