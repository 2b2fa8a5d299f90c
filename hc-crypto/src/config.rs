//! Engine configuration.
//!
//! Everything here is fixed when a [`crate::vault::Vault`] is built. Two vaults
//! sharing a master key but differing in salt or iterations produce keys that
//! are unrelated to each other.

use crate::error::Error;
use serde::Deserialize;

/// Default domain-separation salt.
///
/// Part of the wire contract: other implementations use the same constant, so
/// changing it makes existing envelopes and blind indexes unreadable.
pub const DEFAULT_SALT: &str = "housler_crypto_v1";

/// Default PBKDF2 work factor.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// AEAD cipher used for envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherMode {
    /// AES-256-GCM with a 96-bit nonce and 128-bit tag (envelope version 1).
    #[default]
    Aes256Gcm,
}

/// Keyed hash used for blind indexes.
///
/// Every party querying the same index column must agree on this choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexAlgorithm {
    /// HMAC-SHA256, full 32-byte output.
    #[default]
    HmacSha256,
}

/// Immutable configuration for a [`crate::vault::Vault`].
///
/// # Example
///
/// ```
/// use hc_crypto::config::CryptoConfig;
///
/// let config = CryptoConfig::default()
///     .with_salt("my_app_v1")
///     .with_iterations(200_000);
/// assert_eq!(config.iterations(), 200_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CryptoConfig {
    #[serde(default = "default_salt")]
    salt: String,

    #[serde(default = "default_iterations")]
    iterations: u32,

    #[serde(default)]
    cipher_mode: CipherMode,

    #[serde(default)]
    index_algorithm: IndexAlgorithm,
}

fn default_salt() -> String {
    DEFAULT_SALT.into()
}

const fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            salt: default_salt(),
            iterations: default_iterations(),
            cipher_mode: CipherMode::default(),
            index_algorithm: IndexAlgorithm::default(),
        }
    }
}

impl CryptoConfig {
    /// Sets the domain-separation salt.
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Sets the PBKDF2 iteration count.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the blind index algorithm.
    #[must_use]
    pub const fn with_index_algorithm(mut self, algorithm: IndexAlgorithm) -> Self {
        self.index_algorithm = algorithm;
        self
    }

    /// Returns the salt.
    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Returns the PBKDF2 iteration count.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Returns the envelope cipher.
    #[must_use]
    pub const fn cipher_mode(&self) -> CipherMode {
        self.cipher_mode
    }

    /// Returns the blind index algorithm.
    #[must_use]
    pub const fn index_algorithm(&self) -> IndexAlgorithm {
        self.index_algorithm
    }

    /// Checks values that cannot be expressed in the type.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the iteration count is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if self.iterations == 0 {
            return Err(Error::Configuration("iterations must be greater than zero".to_string()));
        }
        Ok(())
    }
}
