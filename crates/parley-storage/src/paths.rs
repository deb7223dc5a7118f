//! Path utilities for Parley directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const PARLEY_DIR: &str = ".parley";
const DATABASE_FILE: &str = "parley.db";
const LOG_DIR: &str = "logs";

/// Environment variable to override the Parley directory.
const PARLEY_DIR_ENV: &str = "PARLEY_DIR";

/// Resolve the Parley data directory.
/// Priority: PARLEY_DIR env var > ~/.parley/
pub fn resolve_parley_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(PARLEY_DIR_ENV)
        && !dir.trim().is_empty()
    {
        tracing::debug!(dir = %dir, "Using {} override", PARLEY_DIR_ENV);
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(PARLEY_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Parley directory exists and return its path.
pub fn ensure_parley_dir() -> Result<PathBuf> {
    let dir = resolve_parley_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default database path: ~/.parley/parley.db
pub fn database_path() -> Result<PathBuf> {
    Ok(ensure_parley_dir()?.join(DATABASE_FILE))
}

/// Log directory: ~/.parley/logs
pub fn ensure_log_dir() -> Result<PathBuf> {
    let dir = ensure_parley_dir()?.join(LOG_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
