//! Master key derivation and AES-256-GCM primitives
//!
//! The master key is never persisted. It is re-derived on every process start
//! from either `GANTRY_MASTER_KEY` (hashed) or a stable hostname/username
//! identity, so the vault is self-decrypting across restarts without a
//! keyfile.

use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for AES-256-GCM (128 bits)
pub const TAG_SIZE: usize = 16;

/// Crypto-related errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Authentication tag mismatch or corrupt ciphertext
    #[error("decryption failed (wrong key or tampered data)")]
    DecryptionFailed,

    /// Stored nonce/tag have the wrong length, or ciphertext is not valid hex
    #[error("malformed stored ciphertext")]
    Malformed,
}

/// A 256-bit master key derived for the lifetime of the process
#[derive(Clone)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    fn as_key(&self) -> &Key<Aes256Gcm> {
        Key::<Aes256Gcm>::from_slice(&self.0)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("MasterKey(..)")
    }
}

/// One encrypted secret, with nonce and tag kept separate to match the
/// persisted layout.
#[derive(Debug, Clone)]
pub struct EncryptedSecret {
    /// Ciphertext without the trailing tag
    pub ciphertext: Vec<u8>,
    /// Per-encryption random nonce
    pub nonce: Vec<u8>,
    /// GCM authentication tag
    pub tag: Vec<u8>,
}

/// Derive the 256-bit master key.
///
/// With an explicit secret, the key is its SHA-256 digest. Without one, the
/// key is the SHA-256 digest of `"<hostname>-<username>-gantry"`. Same inputs
/// always yield the same key.
pub fn derive_master_key(explicit: Option<&str>) -> MasterKey {
    let mut hasher = Sha256::new();
    match explicit {
        Some(secret) => hasher.update(secret.as_bytes()),
        None => hasher.update(machine_identity().as_bytes()),
    }
    MasterKey(hasher.finalize().into())
}

/// Stable machine identity used when no explicit master secret is set
fn machine_identity() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{host}-{user}-gantry")
}

/// Encrypt a secret under the master key with a fresh random nonce.
pub fn encrypt(key: &MasterKey, plaintext: &str) -> Result<EncryptedSecret, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_key());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut combined = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    // aes-gcm appends the tag to the ciphertext; store it separately
    let tag = combined.split_off(combined.len() - TAG_SIZE);

    Ok(EncryptedSecret {
        ciphertext: combined,
        nonce: nonce.to_vec(),
        tag,
    })
}

/// Decrypt a secret produced by [`encrypt`].
///
/// Any bit-flip in ciphertext, nonce, or tag fails the GCM authentication
/// check; wrong plaintext is never returned.
pub fn decrypt(key: &MasterKey, secret: &EncryptedSecret) -> Result<String, CryptoError> {
    if secret.nonce.len() != NONCE_SIZE || secret.tag.len() != TAG_SIZE {
        return Err(CryptoError::Malformed);
    }

    let cipher = Aes256Gcm::new(key.as_key());
    let nonce = Nonce::from_slice(&secret.nonce);

    let mut combined = Vec::with_capacity(secret.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&secret.ciphertext);
    combined.extend_from_slice(&secret.tag);

    let plaintext = cipher
        .decrypt(nonce, combined.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        derive_master_key(Some("test-master-secret"))
    }

    #[test]
    fn test_roundtrip() {
        let key = test_key();
        let secret = encrypt(&key, "sk-abc123").unwrap();
        assert_eq!(decrypt(&key, &secret).unwrap(), "sk-abc123");
    }

    #[test]
    fn test_roundtrip_empty() {
        let key = test_key();
        let secret = encrypt(&key, "").unwrap();
        assert!(secret.ciphertext.is_empty());
        assert_eq!(decrypt(&key, &secret).unwrap(), "");
    }

    #[test]
    fn test_roundtrip_non_ascii() {
        let key = test_key();
        let plaintext = "clé-secrète-日本語-🔑";
        let secret = encrypt(&key, plaintext).unwrap();
        assert_eq!(decrypt(&key, &secret).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = test_key();
        let a = encrypt(&key, "same plaintext").unwrap();
        let b = encrypt(&key, "same plaintext").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_ciphertext_bit_flip_detected() {
        let key = test_key();
        let mut secret = encrypt(&key, "tamper me").unwrap();
        secret.ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&key, &secret),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tag_bit_flip_detected() {
        let key = test_key();
        let mut secret = encrypt(&key, "tamper me").unwrap();
        secret.tag[TAG_SIZE - 1] ^= 0x80;
        assert!(matches!(
            decrypt(&key, &secret),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_nonce_bit_flip_detected() {
        let key = test_key();
        let mut secret = encrypt(&key, "tamper me").unwrap();
        secret.nonce[0] ^= 0x01;
        assert!(decrypt(&key, &secret).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = test_key();
        let other = derive_master_key(Some("another-secret"));
        let secret = encrypt(&key, "secret").unwrap();
        assert!(decrypt(&other, &secret).is_err());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_master_key(Some("fixed"));
        let b = derive_master_key(Some("fixed"));
        let secret = encrypt(&a, "payload").unwrap();
        assert_eq!(decrypt(&b, &secret).unwrap(), "payload");
    }

    #[test]
    fn test_machine_identity_differs_from_explicit() {
        let machine = derive_master_key(None);
        let explicit = derive_master_key(Some("fixed"));
        let secret = encrypt(&machine, "payload").unwrap();
        assert!(decrypt(&explicit, &secret).is_err());
    }

    #[test]
    fn test_truncated_nonce_rejected() {
        let key = test_key();
        let mut secret = encrypt(&key, "payload").unwrap();
        secret.nonce.pop();
        assert!(matches!(decrypt(&key, &secret), Err(CryptoError::Malformed)));
    }
}
