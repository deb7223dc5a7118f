use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "parley")]
#[command(version, about = "Parley - persistent chat memory with streamed replies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.parley/parley.db)
    #[arg(long, global = true, env = "PARLEY_DB_PATH")]
    pub db_path: Option<String>,

    /// Config file (defaults to ~/.config/parley/config.toml)
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<String>,

    /// Use the offline echo generator instead of a remote model
    #[arg(long, global = true)]
    pub mock: bool,

    /// Mirror logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Send a message and stream the reply as `data:` lines
    Chat {
        /// Message text
        message: String,

        /// Session to continue (a new one is created when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show the stored messages of a session
    History {
        /// Session ID
        session: String,
    },

    /// Delete a session
    Delete {
        /// Session ID
        session: String,

        /// Remove the record instead of archiving it
        #[arg(long)]
        purge: bool,
    },

    /// List active sessions
    Sessions,
}
