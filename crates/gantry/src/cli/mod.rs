//! CLI definition and command handling

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{KeysCommand, LogsCommand, StatusCommand, TeamsCommand};

/// Gantry - deployment platform command proxy CLI
#[derive(Debug, Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage stored team API keys
    Keys(KeysCommand),

    /// List resolvable teams
    Teams(TeamsCommand),

    /// Search and summarize the call audit log
    Logs(LogsCommand),

    /// Show effective configuration
    Status(StatusCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Keys(ref cmd) => cmd.execute(&self),
            Commands::Teams(ref cmd) => cmd.execute(&self),
            Commands::Logs(ref cmd) => cmd.execute(&self),
            Commands::Status(ref cmd) => cmd.execute(&self),
        }
    }
}
