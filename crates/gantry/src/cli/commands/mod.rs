//! CLI command implementations

mod keys;
mod logs;
mod status;
mod teams;

pub use keys::KeysCommand;
pub use logs::LogsCommand;
pub use status::StatusCommand;
pub use teams::TeamsCommand;

use gantry_audit::AuditLog;
use gantry_core::config;
use gantry_core::TeamResolver;
use gantry_vault::{derive_master_key, Vault};

/// Open the credential vault at its default location.
///
/// The master key is derived from `GANTRY_MASTER_KEY` when set, otherwise
/// from the machine identity.
pub(crate) fn open_vault() -> Vault {
    let master = std::env::var(config::MASTER_KEY_ENV).ok();
    let key = derive_master_key(master.as_deref());
    Vault::open(config::config_dir().join(config::KEYS_FILE), key)
}

/// Open the audit log at its default location
pub(crate) fn open_audit() -> AuditLog {
    AuditLog::open(config::config_dir().join(config::LOGS_FILE))
}

/// Build a resolver over the environment-declared teams and the vault
pub(crate) fn build_resolver() -> TeamResolver {
    TeamResolver::new(
        config::teams_from_env(std::env::vars()),
        open_vault(),
        std::env::var(config::DEFAULT_TEAM_ENV).ok(),
    )
}
