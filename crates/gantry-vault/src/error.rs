//! Error types for the credential vault

use thiserror::Error;

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors from vault store operations.
///
/// Persistence failures are hard errors: a mutation must never appear to
/// succeed when the write did not reach disk.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Failed to encrypt a new secret
    #[error("Encryption error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    /// IO error reading or writing the store file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error serializing the store
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
