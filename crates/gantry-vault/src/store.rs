//! Persistent credential store
//!
//! One JSON object maps canonical (lowercase) team names to hex-encoded
//! `{encrypted_key, iv, tag}` records. Every mutation rewrites the whole file
//! through a temp-file-and-rename so readers never observe a partial write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::crypto::{self, CryptoError, EncryptedSecret, MasterKey};
use crate::error::Result;

/// Fixed mask used in credential previews
const MASK: &str = "****";

/// Secrets at or below this length are fully masked
const MASK_REVEAL_THRESHOLD: usize = 8;

/// One persisted credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    name: String,
    encrypted_key: String,
    iv: String,
    tag: String,
}

type StoredKeys = BTreeMap<String, StoredCredential>;

/// A masked credential preview, safe to display
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CredentialView {
    /// Canonical team name
    pub name: String,
    /// First and last four characters around a fixed mask, or all-mask for
    /// short secrets
    pub masked_key: String,
}

/// A decrypted credential, consumed by the team resolver
#[derive(Debug, Clone)]
pub struct DecryptedCredential {
    /// Canonical team name
    pub name: String,
    /// The raw API key
    pub api_key: String,
}

/// A single entry that could not be decrypted.
///
/// Listing and merging tolerate these per entry; one corrupted record never
/// aborts the whole batch.
#[derive(Debug, Error)]
#[error("credential '{name}' is unreadable: {source}")]
pub struct DecryptionError {
    /// Canonical team name of the unreadable entry
    pub name: String,
    #[source]
    source: CryptoError,
}

/// The encrypted credential vault
pub struct Vault {
    path: PathBuf,
    key: MasterKey,
}

impl Vault {
    /// Create a vault handle for the store file at `path`.
    ///
    /// The file does not need to exist; a missing store reads as empty.
    pub fn open(path: impl Into<PathBuf>, key: MasterKey) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// Path of the backing store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add or overwrite a team's credential.
    ///
    /// The name is canonicalized to lowercase and any prior entry is replaced
    /// unconditionally.
    #[instrument(skip(self, api_key))]
    pub fn add(&self, team: &str, api_key: &str) -> Result<()> {
        let name = canonical(team);
        let mut store = self.read_store()?;
        store.insert(name.clone(), self.encrypt_entry(&name, api_key)?);
        self.write_store(&store)?;
        info!(team = %name, "credential stored");
        Ok(())
    }

    /// Remove a team's credential.
    ///
    /// Returns `false` when the name is absent; that is a no-op, not an error.
    #[instrument(skip(self))]
    pub fn remove(&self, team: &str) -> Result<bool> {
        let name = canonical(team);
        let mut store = self.read_store()?;
        if store.remove(&name).is_none() {
            return Ok(false);
        }
        self.write_store(&store)?;
        info!(team = %name, "credential removed");
        Ok(true)
    }

    /// Replace an existing team's credential.
    ///
    /// Returns `false` when the name is absent: rotation never implicitly
    /// creates an entry.
    #[instrument(skip(self, new_api_key))]
    pub fn rotate(&self, team: &str, new_api_key: &str) -> Result<bool> {
        let name = canonical(team);
        let mut store = self.read_store()?;
        if !store.contains_key(&name) {
            return Ok(false);
        }
        store.insert(name.clone(), self.encrypt_entry(&name, new_api_key)?);
        self.write_store(&store)?;
        info!(team = %name, "credential rotated");
        Ok(true)
    }

    /// List masked previews of all stored credentials.
    ///
    /// Never returns a raw secret. Entries that fail to decrypt are reported
    /// as [`DecryptionError`] instead of aborting the listing.
    pub fn list(&self) -> Result<Vec<std::result::Result<CredentialView, DecryptionError>>> {
        let store = self.read_store()?;
        Ok(store
            .into_values()
            .map(|entry| {
                let name = entry.name.clone();
                decrypt_entry(&self.key, entry).map(|cred| CredentialView {
                    name,
                    masked_key: mask_secret(&cred.api_key),
                })
            })
            .collect())
    }

    /// Decrypt every stored credential, with the same per-entry tamper
    /// tolerance as [`Vault::list`].
    pub fn decrypt_all(
        &self,
    ) -> Result<Vec<std::result::Result<DecryptedCredential, DecryptionError>>> {
        let store = self.read_store()?;
        Ok(store
            .into_values()
            .map(|entry| decrypt_entry(&self.key, entry))
            .collect())
    }

    fn encrypt_entry(&self, name: &str, api_key: &str) -> Result<StoredCredential> {
        let secret = crypto::encrypt(&self.key, api_key)?;
        Ok(StoredCredential {
            name: name.to_string(),
            encrypted_key: hex::encode(&secret.ciphertext),
            iv: hex::encode(&secret.nonce),
            tag: hex::encode(&secret.tag),
        })
    }

    fn read_store(&self) -> Result<StoredKeys> {
        if !self.path.exists() {
            return Ok(StoredKeys::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(store) => Ok(store),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "store file unparsable, treating as empty");
                Ok(StoredKeys::new())
            }
        }
    }

    fn write_store(&self, store: &StoredKeys) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, store)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), entries = store.len(), "store persisted");
        Ok(())
    }
}

fn canonical(team: &str) -> String {
    team.trim().to_lowercase()
}

fn decrypt_entry(
    key: &MasterKey,
    entry: StoredCredential,
) -> std::result::Result<DecryptedCredential, DecryptionError> {
    let decode = |field: &str| {
        hex::decode(field).map_err(|_| DecryptionError {
            name: entry.name.clone(),
            source: CryptoError::Malformed,
        })
    };

    let secret = EncryptedSecret {
        ciphertext: decode(&entry.encrypted_key)?,
        nonce: decode(&entry.iv)?,
        tag: decode(&entry.tag)?,
    };

    let api_key = crypto::decrypt(key, &secret).map_err(|source| DecryptionError {
        name: entry.name.clone(),
        source,
    })?;

    Ok(DecryptedCredential {
        name: entry.name,
        api_key,
    })
}

/// Mask a secret for display: first four and last four characters around a
/// fixed mask for secrets longer than eight characters, otherwise a full mask.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > MASK_REVEAL_THRESHOLD {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}{MASK}{tail}")
    } else {
        MASK.to_string()
    }
}
