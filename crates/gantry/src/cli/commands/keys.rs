//! Key management CLI commands

use anyhow::bail;
use clap::{Args, Subcommand};
use tracing::info;

use crate::cli::{output, Cli, OutputFormat};

use super::build_resolver;

/// Manage stored team API keys
#[derive(Debug, Args)]
pub struct KeysCommand {
    #[command(subcommand)]
    pub command: KeysSubcommand,
}

/// Key management subcommands
#[derive(Debug, Subcommand)]
pub enum KeysSubcommand {
    /// Store (or overwrite) a team's API key
    Add(KeyAddCommand),

    /// Remove a team's stored API key
    Remove(KeyRemoveCommand),

    /// Replace an existing team's API key
    Rotate(KeyRotateCommand),

    /// List stored keys with masked previews
    List(KeyListCommand),
}

/// Store an API key for a team
#[derive(Debug, Args)]
pub struct KeyAddCommand {
    /// Team name
    #[arg(required = true)]
    pub team: String,

    /// The API key to store
    #[arg(required = true)]
    pub api_key: String,
}

/// Remove a team's stored key
#[derive(Debug, Args)]
pub struct KeyRemoveCommand {
    /// Team name
    #[arg(required = true)]
    pub team: String,
}

/// Rotate a team's stored key
#[derive(Debug, Args)]
pub struct KeyRotateCommand {
    /// Team name
    #[arg(required = true)]
    pub team: String,

    /// The new API key
    #[arg(required = true)]
    pub new_api_key: String,
}

/// List stored keys
#[derive(Debug, Args)]
pub struct KeyListCommand {}

impl KeysCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let subcommand_name = match &self.command {
            KeysSubcommand::Add(_) => "add",
            KeysSubcommand::Remove(_) => "remove",
            KeysSubcommand::Rotate(_) => "rotate",
            KeysSubcommand::List(_) => "list",
        };
        info!(subcommand = subcommand_name, "executing keys command");
        match &self.command {
            KeysSubcommand::Add(cmd) => cmd.execute(cli),
            KeysSubcommand::Remove(cmd) => cmd.execute(cli),
            KeysSubcommand::Rotate(cmd) => cmd.execute(cli),
            KeysSubcommand::List(cmd) => cmd.execute(cli),
        }
    }
}

impl KeyAddCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let resolver = build_resolver();
        resolver.vault().add(&self.team, &self.api_key)?;
        resolver.invalidate();

        match cli.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({"team": self.team.to_lowercase(), "stored": true})
            ),
            OutputFormat::Text => {
                output::success(&format!(
                    "Stored API key for team '{}'",
                    self.team.to_lowercase()
                ));
            }
        }
        Ok(())
    }
}

impl KeyRemoveCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let resolver = build_resolver();
        let removed = resolver.vault().remove(&self.team)?;
        resolver.invalidate();

        match cli.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({"team": self.team.to_lowercase(), "removed": removed})
            ),
            OutputFormat::Text => {
                if removed {
                    output::success(&format!(
                        "Removed API key for team '{}'",
                        self.team.to_lowercase()
                    ));
                } else {
                    output::warning(&format!(
                        "No API key stored for team '{}'",
                        self.team.to_lowercase()
                    ));
                }
            }
        }
        Ok(())
    }
}

impl KeyRotateCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let resolver = build_resolver();
        let rotated = resolver.vault().rotate(&self.team, &self.new_api_key)?;
        resolver.invalidate();

        if !rotated {
            bail!(
                "no API key stored for team '{}'; use 'gantry keys add' first",
                self.team.to_lowercase()
            );
        }

        match cli.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({"team": self.team.to_lowercase(), "rotated": true})
            ),
            OutputFormat::Text => {
                output::success(&format!(
                    "Rotated API key for team '{}'",
                    self.team.to_lowercase()
                ));
            }
        }
        Ok(())
    }
}

impl KeyListCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let resolver = build_resolver();
        let entries = resolver.vault().list()?;

        match cli.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|entry| match entry {
                        Ok(view) => serde_json::json!({
                            "name": view.name,
                            "masked_key": view.masked_key,
                        }),
                        Err(err) => serde_json::json!({
                            "name": err.name,
                            "masked_key": "[decryption failed]",
                        }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No API keys stored.");
                    return Ok(());
                }
                println!("{}", output::header("Stored API keys"));
                for entry in &entries {
                    match entry {
                        Ok(view) => println!("{}", output::key_value(&view.name, &view.masked_key)),
                        Err(err) => {
                            println!("{}", output::key_value(&err.name, "[decryption failed]"))
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
