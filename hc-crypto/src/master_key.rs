//! Master key parsing and generation.

use crate::error::Error;
use aes_gcm::aead::{rand_core::RngCore, OsRng};
use secrecy::{ExposeSecret, SecretVec};
use std::fmt;

/// Master key size in bytes (256 bits).
pub const MASTER_KEY_SIZE: usize = 32;

/// The root secret every field key is derived from.
///
/// Parsed from a hex string at the boundary and held in a [`SecretVec`] for
/// the lifetime of the owning engine. The core never persists it.
pub struct MasterKey(SecretVec<u8>);

impl MasterKey {
    /// Parses a hex-encoded 256-bit key (exactly 64 hex characters).
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the key is empty, has the wrong length
    /// or contains non-hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, Error> {
        if hex_key.is_empty() {
            return Err(Error::Configuration("master key is required".to_string()));
        }

        if hex_key.len() != MASTER_KEY_SIZE * 2 {
            return Err(Error::Configuration(format!(
                "master key must be {} bytes ({} hex characters), got {} characters",
                MASTER_KEY_SIZE,
                MASTER_KEY_SIZE * 2,
                hex_key.len()
            )));
        }

        let bytes = hex::decode(hex_key)
            .map_err(|e| Error::Configuration(format!("invalid master key: {e}")))?;

        Ok(Self(SecretVec::new(bytes)))
    }

    /// Generates a fresh random master key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = vec![0u8; MASTER_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(SecretVec::new(key))
    }

    /// Returns the key encoded as 64 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.expose_secret())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Generates a new random master key, hex-encoded and ready for
/// [`crate::vault::Vault::new`].
///
/// # Example
///
/// ```
/// let key = hc_crypto::master_key::generate_key();
/// assert_eq!(key.len(), 64);
/// ```
#[must_use]
pub fn generate_key() -> String {
    MasterKey::generate().to_hex()
}
