//! Configuration status CLI command

use clap::Args;

use gantry_core::{Config, TeamResolver};

use crate::cli::{output, Cli, OutputFormat};

use super::{open_audit, open_vault};

/// Show the effective configuration and resolvable teams.
///
/// Fails with a configuration error (exit code 2) when required settings are
/// missing, mirroring what the proxy would do at startup.
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let config = Config::load()?;
        let resolver = TeamResolver::new(
            config.env_teams.clone(),
            open_vault(),
            config.default_team.clone(),
        );

        let teams = resolver.list_teams()?;
        let default_team = resolver.default_team()?;
        let log_path = open_audit().path().to_path_buf();

        match cli.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "base_url": config.base_url,
                        "default_team": default_team,
                        "teams": teams,
                        "audit_log": log_path,
                    }))?
                );
            }
            OutputFormat::Text => {
                println!("{}", output::header("Gantry status"));
                println!("{}", output::key_value("base URL", &config.base_url));
                println!("{}", output::key_value("default team", &default_team));
                println!(
                    "{}",
                    output::key_value("teams", &teams.join(", "))
                );
                println!(
                    "{}",
                    output::key_value("audit log", &log_path.display().to_string())
                );
            }
        }
        Ok(())
    }
}
