//! Parley configuration file support
//!
//! Loads configuration from ~/.config/parley/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MemoryError, Result};
use crate::memory::DEFAULT_CONTEXT_WINDOW;
use crate::stream::DEFAULT_BUFFER_SIZE;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 1.0;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const MIN_MAX_MESSAGES: usize = 1;
const MIN_BUFFER_SIZE: usize = 1;
const MAX_TEMPERATURE: f32 = 2.0;

const API_KEY_ENVS: [&str; 2] = ["PARLEY_API_KEY", "OPENAI_API_KEY"];

/// Parley configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParleyConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Generation service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Prepended to every generation request, never persisted
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }
}

/// Conversation memory settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of most recent messages given to the model
    pub max_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

/// Streaming bridge settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Frames buffered before generation is paused
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Database path, defaults to ~/.parley/parley.db
    pub db_path: Option<String>,
}

impl ParleyConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("parley").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.memory.max_messages < MIN_MAX_MESSAGES {
            return Err(MemoryError::Config(format!(
                "Memory max_messages must be at least {}",
                MIN_MAX_MESSAGES
            )));
        }

        if self.stream.buffer_size < MIN_BUFFER_SIZE {
            return Err(MemoryError::Config(format!(
                "Stream buffer_size must be at least {}",
                MIN_BUFFER_SIZE
            )));
        }

        if !(0.0..=MAX_TEMPERATURE).contains(&self.llm.temperature) {
            return Err(MemoryError::Config(format!(
                "LLM temperature must be between 0 and {}",
                MAX_TEMPERATURE
            )));
        }

        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(MemoryError::Config(
                "LLM top_p must be between 0 and 1".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(MemoryError::Config(
                "LLM max_tokens must be at least 1".to_string(),
            ));
        }

        if self.llm.base_url.trim().is_empty() {
            return Err(MemoryError::Config("LLM base_url must not be empty".to_string()));
        }

        Ok(())
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        API_KEY_ENVS
            .iter()
            .filter_map(|name| lookup(name))
            .chain(self.llm.api_key.clone())
            .find(|key| !key.trim().is_empty())
    }

    /// Database path from config, or the default under the Parley directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(parley_storage::paths::database_path()?),
        }
    }
}
