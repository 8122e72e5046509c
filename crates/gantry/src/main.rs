//! Gantry - deployment platform command proxy CLI

mod cli;
mod exit_codes;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::Cli;

fn main() {
    let _guard = init_tracing();

    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        cli::output::error(&format!("{err:#}"));
        std::process::exit(exit_code_for(&err));
    }
}

/// Map startup and runtime failures to process exit codes. Configuration
/// errors get their own code so wrappers can tell them apart.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<gantry_core::ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    if let Some(gantry_core::GantryError::Config(_)) = err.downcast_ref::<gantry_core::GantryError>()
    {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::ERROR
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: warn)
/// - File: always debug-level JSON under the gantry config directory
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(log_dir) = log_directory() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "gantry.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the log directory path, creating it if needed.
fn log_directory() -> Option<std::path::PathBuf> {
    let log_dir = gantry_core::config::config_dir().join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}
