//! Team listing CLI command

use clap::Args;
use console::style;

use crate::cli::{output, Cli, OutputFormat};

use super::build_resolver;

/// List resolvable teams (environment and vault merged)
#[derive(Debug, Args)]
pub struct TeamsCommand {}

impl TeamsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let resolver = build_resolver();
        let teams = resolver.list_teams()?;
        let default_team = resolver.default_team()?;

        match cli.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "teams": teams,
                        "default": default_team,
                    }))?
                );
            }
            OutputFormat::Text => {
                println!("{}", output::header("Teams"));
                for team in &teams {
                    if *team == default_team {
                        println!("  {} {}", team, style("(default)").dim());
                    } else {
                        println!("  {team}");
                    }
                }
            }
        }
        Ok(())
    }
}
