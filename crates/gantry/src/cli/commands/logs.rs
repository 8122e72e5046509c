//! Audit log CLI commands

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use tracing::info;

use gantry_audit::{CallStatus, SearchFilters};

use crate::cli::{output, Cli, OutputFormat};

use super::open_audit;

/// Search and summarize the call audit log
#[derive(Debug, Args)]
pub struct LogsCommand {
    #[command(subcommand)]
    pub command: LogsSubcommand,
}

/// Audit log subcommands
#[derive(Debug, Subcommand)]
pub enum LogsSubcommand {
    /// Search past calls with AND-combined filters
    Search(LogSearchCommand),

    /// Aggregate calls over a recent time window
    Summary(LogSummaryCommand),
}

/// Search the audit log
#[derive(Debug, Args)]
pub struct LogSearchCommand {
    /// Case-insensitive keyword over tool, team, summary, and params
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Substring match on the tool identifier
    #[arg(long)]
    pub tool: Option<String>,

    /// Exact team name
    #[arg(long)]
    pub team: Option<String>,

    /// Call status (success or error)
    #[arg(long)]
    pub status: Option<CallStatus>,

    /// Inclusive start timestamp (RFC 3339)
    #[arg(long, value_parser = parse_utc)]
    pub since: Option<DateTime<Utc>>,

    /// Inclusive end timestamp (RFC 3339)
    #[arg(long, value_parser = parse_utc)]
    pub until: Option<DateTime<Utc>>,

    /// Maximum number of entries to return (most recent kept)
    #[arg(short, long, default_value = "50")]
    pub limit: usize,
}

/// Summarize recent calls
#[derive(Debug, Args)]
pub struct LogSummaryCommand {
    /// Window size in hours
    #[arg(long, default_value = "24")]
    pub hours: u64,
}

fn parse_utc(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{s}': {e}"))
}

impl LogsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let subcommand_name = match &self.command {
            LogsSubcommand::Search(_) => "search",
            LogsSubcommand::Summary(_) => "summary",
        };
        info!(subcommand = subcommand_name, "executing logs command");
        match &self.command {
            LogsSubcommand::Search(cmd) => cmd.execute(cli),
            LogsSubcommand::Summary(cmd) => cmd.execute(cli),
        }
    }
}

impl LogSearchCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let filters = SearchFilters {
            keyword: self.keyword.clone(),
            tool: self.tool.clone(),
            team: self.team.clone(),
            status: self.status,
            start_time: self.since,
            end_time: self.until,
            limit: Some(self.limit),
        };
        let entries = open_audit().query(&filters)?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No matching calls.");
                    return Ok(());
                }
                for entry in &entries {
                    println!(
                        "{} [{}] {} team={} {}ms  {}",
                        entry.timestamp.to_rfc3339(),
                        entry.status,
                        entry.tool,
                        entry.team,
                        entry.duration_ms,
                        entry.response_summary,
                    );
                }
            }
        }
        Ok(())
    }
}

impl LogSummaryCommand {
    fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let summary = open_audit().summarize(self.hours)?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Text => {
                println!(
                    "{}",
                    output::header(&format!("Call summary, last {}h", self.hours))
                );
                println!(
                    "{}",
                    output::key_value(
                        "period",
                        &format!(
                            "{} .. {}",
                            summary.period_start.to_rfc3339(),
                            summary.period_end.to_rfc3339()
                        )
                    )
                );
                println!(
                    "{}",
                    output::key_value("total", &summary.total_calls.to_string())
                );
                println!(
                    "{}",
                    output::key_value(
                        "success / error",
                        &format!("{} / {}", summary.success_count, summary.error_count)
                    )
                );
                println!(
                    "{}",
                    output::key_value("avg duration", &format!("{}ms", summary.avg_duration_ms))
                );
                if !summary.by_team.is_empty() {
                    println!("{}", output::header("By team"));
                    for (team, count) in &summary.by_team {
                        println!("{}", output::key_value(team, &count.to_string()));
                    }
                }
                if !summary.by_tool.is_empty() {
                    println!("{}", output::header("By tool"));
                    for (tool, count) in &summary.by_tool {
                        println!("{}", output::key_value(tool, &count.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}
