mod cli;
mod commands;
mod completions;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use parley_storage::paths;
use setup::prepare_core;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_FILTER: &str = "info,parley=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    // Always log to file; stdout carries command output only.
    let log_dir = paths::ensure_log_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "parley.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true);
    let stderr_layer = cli
        .verbose
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    let core = prepare_core(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Chat { message, session } => commands::chat::run(core, message, session).await,
        Commands::History { session } => commands::session::show_history(&core, &session, format),
        Commands::Delete { session, purge } => {
            commands::session::delete_session(&core, &session, purge, format)
        }
        Commands::Sessions => commands::session::list_sessions(&core, format),
        Commands::Completions { .. } => Ok(()),
    }
}
