//! Encrypted per-team credential vault.
//!
//! Stores one API key per team, encrypted at rest with AES-256-GCM under a
//! master key derived from either an operator-supplied secret or a stable
//! machine identity. The whole store is a single JSON file that is rewritten
//! atomically on every mutation.

pub mod crypto;
pub mod error;
pub mod store;

pub use crypto::{derive_master_key, CryptoError, EncryptedSecret, MasterKey};
pub use error::{Result, VaultError};
pub use store::{CredentialView, DecryptedCredential, DecryptionError, Vault};
