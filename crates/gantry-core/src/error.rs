//! Error types for Gantry

use thiserror::Error;

/// Result type alias using GantryError
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for Gantry operations
#[derive(Debug, Error)]
pub enum GantryError {
    /// Configuration-related errors; fatal at startup
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A team name did not resolve; recoverable, lists the valid names
    #[error("Team '{team}' not found. Available teams: {}", known.join(", "))]
    UnknownTeam {
        /// Canonical name that missed
        team: String,
        /// Every currently known canonical team name
        known: Vec<String>,
    },

    /// Vault errors (persistence failures are hard failures)
    #[error(transparent)]
    Vault(#[from] gantry_vault::VaultError),

    /// Audit log read errors
    #[error(transparent)]
    Audit(#[from] gantry_audit::AuditError),

    /// A proxied call failed upstream
    #[error("{tool} failed: {message}")]
    CallFailed {
        /// Tool identifier of the failed call
        tool: String,
        /// Upstream error description
        message: String,
    },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required setting absent from both file and environment
    #[error("Missing required configuration: {0}")]
    MissingField(String),

    /// Base URL present but not a valid absolute URL
    #[error("GANTRY_BASE_URL must be a valid URL (e.g. https://deploy.example.com): {0}")]
    InvalidBaseUrl(String),

    /// No tenant credentials resolvable from environment or vault
    #[error(
        "No API keys configured. Set GANTRY_API_KEY or GANTRY_TEAM_<NAME>_API_KEY, \
         or store one with 'gantry keys add'"
    )]
    NoTeams,

    /// TOML parsing error in the config file
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error reading config
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}
