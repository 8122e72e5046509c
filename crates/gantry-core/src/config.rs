//! Configuration loading
//!
//! Base settings come from an optional `config.toml` in the per-user config
//! directory, with environment variables taking precedence. Per-team API keys
//! declared in the environment are merged with vault-stored ones by the
//! resolver.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the upstream API base URL
pub const BASE_URL_ENV: &str = "GANTRY_BASE_URL";

/// Environment variable naming the default team
pub const DEFAULT_TEAM_ENV: &str = "GANTRY_DEFAULT_TEAM";

/// Environment variable holding the single-team API key (team `default`)
pub const API_KEY_ENV: &str = "GANTRY_API_KEY";

/// Environment variable holding the optional vault master secret
pub const MASTER_KEY_ENV: &str = "GANTRY_MASTER_KEY";

/// Prefix/suffix pattern for per-team API keys: `GANTRY_TEAM_<NAME>_API_KEY`
const TEAM_KEY_PREFIX: &str = "GANTRY_TEAM_";
const TEAM_KEY_SUFFIX: &str = "_API_KEY";

/// Name of the optional settings file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Credential store file name
pub const KEYS_FILE: &str = "keys.json";

/// Audit log file name
pub const LOGS_FILE: &str = "logs.jsonl";

/// Per-user configuration directory (`$XDG_CONFIG_HOME/gantry` on Linux)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gantry")
}

/// Optional settings file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    /// Upstream API base URL
    pub base_url: Option<String>,
    /// Preferred default team name
    pub default_team: Option<String>,
}

/// Validated base configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream API base URL
    pub base_url: String,
    /// Configured default team, if any; the resolver picks the effective one
    pub default_team: Option<String>,
    /// Environment-declared teams, canonical name to API key
    pub env_teams: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from the default config directory and the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = load_file_settings(&config_dir().join(CONFIG_FILE))?;
        Self::from_sources(file, std::env::vars())
    }

    /// Build configuration from explicit sources. Environment entries
    /// override the file for base settings.
    pub fn from_sources(
        file: FileSettings,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let mut base_url = file.base_url;
        let mut default_team = file.default_team;
        let mut env_teams = BTreeMap::new();

        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                BASE_URL_ENV => base_url = Some(value),
                DEFAULT_TEAM_ENV => default_team = Some(value),
                API_KEY_ENV => {
                    env_teams.insert("default".to_string(), value);
                }
                _ => {
                    if let Some(name) = team_name_from_var(&key) {
                        env_teams.insert(name, value);
                    }
                }
            }
        }

        let base_url = base_url.ok_or_else(|| {
            ConfigError::MissingField(format!(
                "{BASE_URL_ENV} (set it to your deployment platform URL)"
            ))
        })?;
        validate_base_url(&base_url)?;

        debug!(
            teams = env_teams.len(),
            default = default_team.as_deref().unwrap_or("<unset>"),
            "configuration loaded"
        );

        Ok(Self {
            base_url,
            default_team: default_team.map(|t| t.trim().to_lowercase()),
            env_teams,
        })
    }
}

/// Extract environment-declared teams without requiring a full config.
///
/// The key-management surface needs team declarations but not the base URL.
pub fn teams_from_env(
    vars: impl IntoIterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    let mut teams = BTreeMap::new();
    for (key, value) in vars {
        if value.is_empty() {
            continue;
        }
        if key == API_KEY_ENV {
            teams.insert("default".to_string(), value);
        } else if let Some(name) = team_name_from_var(&key) {
            teams.insert(name, value);
        }
    }
    teams
}

fn team_name_from_var(key: &str) -> Option<String> {
    let rest = key.strip_prefix(TEAM_KEY_PREFIX)?;
    let name = rest.strip_suffix(TEAM_KEY_SUFFIX)?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

fn load_file_settings(path: &std::path::Path) -> Result<FileSettings, ConfigError> {
    if !path.exists() {
        return Ok(FileSettings::default());
    }
    info!(path = %path.display(), "loading settings file");
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl(format!(
            "'{base_url}' has no host"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_missing_base_url_is_fatal() {
        let err = Config::from_sources(FileSettings::default(), vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Config::from_sources(
            FileSettings::default(),
            vec![var("GANTRY_BASE_URL", "not a url")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileSettings {
            base_url: Some("https://file.example.com".to_string()),
            default_team: Some("filers".to_string()),
        };
        let config = Config::from_sources(
            file,
            vec![
                var("GANTRY_BASE_URL", "https://env.example.com"),
                var("GANTRY_DEFAULT_TEAM", "Envers"),
            ],
        )
        .unwrap();

        assert_eq!(config.base_url, "https://env.example.com");
        assert_eq!(config.default_team.as_deref(), Some("envers"));
    }

    #[test]
    fn test_file_settings_used_when_env_absent() {
        let file = FileSettings {
            base_url: Some("https://file.example.com".to_string()),
            default_team: None,
        };
        let config = Config::from_sources(file, vec![]).unwrap();
        assert_eq!(config.base_url, "https://file.example.com");
        assert!(config.default_team.is_none());
    }

    #[test]
    fn test_team_vars_parsed_and_lowercased() {
        let teams = teams_from_env(vec![
            var("GANTRY_TEAM_PROD_API_KEY", "key-prod"),
            var("GANTRY_TEAM_Staging_API_KEY", "key-staging"),
            var("GANTRY_API_KEY", "key-default"),
            var("GANTRY_TEAM__API_KEY", "ignored-empty-name"),
            var("UNRELATED_VAR", "ignored"),
        ]);

        assert_eq!(teams.len(), 3);
        assert_eq!(teams["prod"], "key-prod");
        assert_eq!(teams["staging"], "key-staging");
        assert_eq!(teams["default"], "key-default");
    }

    #[test]
    fn test_empty_values_ignored() {
        let teams = teams_from_env(vec![var("GANTRY_TEAM_PROD_API_KEY", "")]);
        assert!(teams.is_empty());
    }
}
