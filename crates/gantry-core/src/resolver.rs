//! Team resolution
//!
//! Merges environment-declared and vault-stored credentials into one registry
//! and turns a team name (or its absence) into a usable API key. The registry
//! is an explicit context object owned by the caller, cached behind a lock
//! and rebuilt after [`TeamResolver::invalidate`].

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use gantry_vault::Vault;

use crate::error::{ConfigError, GantryError, Result};

/// A resolved team: canonical name plus its API key
#[derive(Debug, Clone)]
pub struct ResolvedTeam {
    /// Canonical team name
    pub name: String,
    /// The team's API key
    pub api_key: String,
}

/// The merged runtime registry. Derived, never persisted.
#[derive(Debug)]
struct TeamRegistry {
    /// Canonical name to API key
    teams: BTreeMap<String, String>,
    /// Effective default team name, always a member of `teams`
    default_team: String,
}

/// Resolves team names against environment and vault credentials.
///
/// Credentials stored in the vault take precedence over environment-declared
/// ones for the same canonical name: management mutations go through the
/// vault, so the vault carries the operator's latest word.
pub struct TeamResolver {
    env_teams: BTreeMap<String, String>,
    vault: Vault,
    configured_default: Option<String>,
    registry: RwLock<Option<Arc<TeamRegistry>>>,
}

impl TeamResolver {
    /// Create a resolver over environment teams and a vault.
    ///
    /// `configured_default` is the operator's preferred default team; it does
    /// not have to exist, see [`choose_default`].
    pub fn new(
        env_teams: BTreeMap<String, String>,
        vault: Vault,
        configured_default: Option<String>,
    ) -> Self {
        Self {
            env_teams,
            vault,
            configured_default: configured_default.map(|t| t.trim().to_lowercase()),
            registry: RwLock::new(None),
        }
    }

    /// The vault backing this resolver.
    ///
    /// Mutations through it must be followed by [`TeamResolver::invalidate`].
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Resolve a team name (or the default when omitted) to its API key.
    pub fn resolve(&self, team: Option<&str>) -> Result<ResolvedTeam> {
        let registry = self.snapshot()?;
        let name = match team {
            Some(t) => t.trim().to_lowercase(),
            None => registry.default_team.clone(),
        };

        match registry.teams.get(&name) {
            Some(api_key) => Ok(ResolvedTeam {
                name,
                api_key: api_key.clone(),
            }),
            None => Err(GantryError::UnknownTeam {
                team: name,
                known: registry.teams.keys().cloned().collect(),
            }),
        }
    }

    /// All known canonical team names, sorted.
    pub fn list_teams(&self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.teams.keys().cloned().collect())
    }

    /// The effective default team name.
    pub fn default_team(&self) -> Result<String> {
        Ok(self.snapshot()?.default_team.clone())
    }

    /// Drop the cached registry so the next resolution rebuilds it.
    ///
    /// Must be called after every vault mutation on the management surface so
    /// resolution never returns a stale or just-removed secret.
    pub fn invalidate(&self) {
        let mut guard = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        debug!("team registry invalidated");
    }

    fn snapshot(&self) -> Result<Arc<TeamRegistry>> {
        {
            let guard = self
                .registry
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(registry) = guard.as_ref() {
                return Ok(Arc::clone(registry));
            }
        }

        let mut guard = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(registry) = guard.as_ref() {
            return Ok(Arc::clone(registry));
        }

        let built = Arc::new(self.build_registry()?);
        *guard = Some(Arc::clone(&built));
        Ok(built)
    }

    fn build_registry(&self) -> Result<TeamRegistry> {
        let mut teams = self.env_teams.clone();

        for entry in self.vault.decrypt_all()? {
            match entry {
                // Vault wins over the environment on name collisions
                Ok(cred) => {
                    teams.insert(cred.name, cred.api_key);
                }
                Err(err) => {
                    warn!(%err, "skipping unreadable vault entry during merge");
                }
            }
        }

        if teams.is_empty() {
            return Err(ConfigError::NoTeams.into());
        }

        let default_team = choose_default(self.configured_default.as_deref(), &teams);
        debug!(
            teams = teams.len(),
            default = %default_team,
            "team registry built"
        );

        Ok(TeamRegistry {
            teams,
            default_team,
        })
    }
}

/// Pick the effective default team.
///
/// The configured name wins when it is known; otherwise the first known name
/// in sorted order, which is stable for a given registry state. `known` must
/// be non-empty.
fn choose_default(configured: Option<&str>, known: &BTreeMap<String, String>) -> String {
    if let Some(name) = configured {
        if known.contains_key(name) {
            return name.to_string();
        }
        warn!(
            configured = name,
            "configured default team is unknown, falling back"
        );
    }
    known
        .keys()
        .next()
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_vault::derive_master_key;
    use tempfile::TempDir;

    fn empty_vault(dir: &TempDir) -> Vault {
        Vault::open(
            dir.path().join("keys.json"),
            derive_master_key(Some("test-master")),
        )
    }

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_named_team() {
        let dir = TempDir::new().unwrap();
        let resolver = TeamResolver::new(env(&[("acme", "key-1")]), empty_vault(&dir), None);

        let team = resolver.resolve(Some("ACME")).unwrap();
        assert_eq!(team.name, "acme");
        assert_eq!(team.api_key, "key-1");
    }

    #[test]
    fn test_resolve_default_when_omitted() {
        let dir = TempDir::new().unwrap();
        let resolver = TeamResolver::new(
            env(&[("acme", "key-1"), ("globex", "key-2")]),
            empty_vault(&dir),
            Some("globex".to_string()),
        );

        let team = resolver.resolve(None).unwrap();
        assert_eq!(team.name, "globex");
    }

    #[test]
    fn test_unknown_team_enumerates_known() {
        let dir = TempDir::new().unwrap();
        let resolver = TeamResolver::new(
            env(&[("acme", "key-1"), ("globex", "key-2")]),
            empty_vault(&dir),
            None,
        );

        let err = resolver.resolve(Some("nobody")).unwrap_err();
        match err {
            GantryError::UnknownTeam { team, known } => {
                assert_eq!(team, "nobody");
                assert_eq!(known, vec!["acme".to_string(), "globex".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_teams_is_fatal() {
        let dir = TempDir::new().unwrap();
        let resolver = TeamResolver::new(BTreeMap::new(), empty_vault(&dir), None);

        let err = resolver.resolve(None).unwrap_err();
        assert!(matches!(
            err,
            GantryError::Config(ConfigError::NoTeams)
        ));
    }

    #[test]
    fn test_default_falls_back_deterministically() {
        let dir = TempDir::new().unwrap();
        let resolver = TeamResolver::new(
            env(&[("bravo", "b"), ("alpha", "a")]),
            empty_vault(&dir),
            Some("ghost".to_string()),
        );

        // Unknown configured default falls back to the first sorted name
        assert_eq!(resolver.default_team().unwrap(), "alpha");
        assert_eq!(resolver.default_team().unwrap(), "alpha");
    }

    #[test]
    fn test_vault_overrides_environment() {
        let dir = TempDir::new().unwrap();
        let vault = empty_vault(&dir);
        vault.add("acme", "vault-key").unwrap();

        let resolver = TeamResolver::new(env(&[("acme", "env-key")]), vault, None);
        assert_eq!(resolver.resolve(Some("acme")).unwrap().api_key, "vault-key");
    }

    #[test]
    fn test_vault_only_teams_resolve() {
        let dir = TempDir::new().unwrap();
        let vault = empty_vault(&dir);
        vault.add("solo", "solo-key").unwrap();

        let resolver = TeamResolver::new(BTreeMap::new(), vault, None);
        assert_eq!(resolver.resolve(None).unwrap().name, "solo");
    }

    #[test]
    fn test_invalidate_picks_up_rotation() {
        let dir = TempDir::new().unwrap();
        let vault = empty_vault(&dir);
        vault.add("acme", "old-key-12").unwrap();

        let resolver = TeamResolver::new(BTreeMap::new(), vault, None);
        assert_eq!(resolver.resolve(Some("acme")).unwrap().api_key, "old-key-12");

        resolver.vault().rotate("acme", "new-key-34").unwrap();

        // Stale until invalidated
        assert_eq!(resolver.resolve(Some("acme")).unwrap().api_key, "old-key-12");
        resolver.invalidate();
        assert_eq!(resolver.resolve(Some("acme")).unwrap().api_key, "new-key-34");
    }

    #[test]
    fn test_invalidate_picks_up_removal() {
        let dir = TempDir::new().unwrap();
        let vault = empty_vault(&dir);
        vault.add("acme", "key").unwrap();
        vault.add("globex", "key").unwrap();

        let resolver = TeamResolver::new(BTreeMap::new(), vault, None);
        assert!(resolver.resolve(Some("acme")).is_ok());

        resolver.vault().remove("acme").unwrap();
        resolver.invalidate();

        assert!(matches!(
            resolver.resolve(Some("acme")),
            Err(GantryError::UnknownTeam { .. })
        ));
        assert_eq!(resolver.list_teams().unwrap(), vec!["globex".to_string()]);
    }

    #[test]
    fn test_unreadable_vault_entry_skipped_in_merge() {
        let dir = TempDir::new().unwrap();
        let vault = empty_vault(&dir);
        vault.add("good", "good-key-1").unwrap();
        vault.add("bad", "bad-key-22").unwrap();

        // Corrupt the tag of the "bad" entry on disk
        let path = vault.path().to_path_buf();
        let raw = std::fs::read_to_string(&path).unwrap();
        let mut store: serde_json::Value = serde_json::from_str(&raw).unwrap();
        store["bad"]["tag"] = serde_json::Value::String("00".repeat(16));
        std::fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();

        let resolver = TeamResolver::new(BTreeMap::new(), vault, None);
        assert_eq!(resolver.list_teams().unwrap(), vec!["good".to_string()]);
    }
}
