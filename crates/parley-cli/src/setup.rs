//! CLI setup module
//!
//! Loads configuration and builds the embedded Parley core.

use anyhow::Result;
use parley_core::llm::{GenerationService, MockGenerationClient, OpenAiGenerationClient};
use parley_core::{AppCore, ParleyConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;

const MOCK_MODEL: &str = "mock-echo";

/// Build the embedded Parley core
pub fn prepare_core(cli: &Cli) -> Result<Arc<AppCore>> {
    let mut config = match &cli.config {
        Some(path) => ParleyConfig::load_from_path(Some(PathBuf::from(path))),
        None => ParleyConfig::load(),
    };
    if let Some(db_path) = &cli.db_path {
        config.storage.db_path = Some(db_path.clone());
    }

    let generator = build_generator(&config, cli.mock);
    Ok(Arc::new(AppCore::new(config, generator)?))
}

fn build_generator(config: &ParleyConfig, mock: bool) -> Arc<dyn GenerationService> {
    if mock {
        return Arc::new(MockGenerationClient::new(MOCK_MODEL));
    }

    match config.api_key() {
        Some(key) => Arc::new(
            OpenAiGenerationClient::new(key)
                .with_model(&config.llm.model_name)
                .with_base_url(&config.llm.base_url),
        ),
        None => {
            tracing::warn!("No API key configured, using the offline echo generator");
            Arc::new(MockGenerationClient::new(MOCK_MODEL))
        }
    }
}
