//! Vault for field-scoped encryption, decryption and blind indexing.
//!
//! The Vault owns a master key and derives one key per logical field. Values
//! are encrypted with AES-256-GCM and stored as self-describing envelopes (see
//! [`crate::envelope`]).

use crate::blind_index;
use crate::config::{CryptoConfig, IndexAlgorithm};
use crate::envelope::{self, Envelope, NONCE_SIZE, TAG_SIZE};
use crate::error::Error;
use crate::kdf::FieldKeyDeriver;
use crate::master_key::MasterKey;
use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use zeroize::Zeroizing;

pub use crate::config::CipherMode;
pub use crate::master_key::generate_key;

/// Field name used by callers that do not partition their data.
///
/// It is an ordinary field name with no special handling; encrypt, decrypt and
/// blind index call sites just have to agree on it.
pub const DEFAULT_FIELD: &str = "default";

/// Vault for field-scoped PII encryption.
///
/// Each call to [`Vault::encrypt`]:
/// 1. Derives (or fetches from cache) the key for the field
/// 2. Generates a random 96-bit nonce
/// 3. Encrypts with AES-256-GCM, no associated data
/// 4. Packs version, nonce, tag and ciphertext into an `"hc1:"` envelope
///
/// Clones share the key cache, and the vault is safe to use from many threads.
///
/// # Nonce budget
///
/// Nonces are random, so the number of encryptions under one field key must
/// stay well below 2^32 to keep the collision probability negligible. A nonce
/// collision under the same field key breaks confidentiality of both values.
///
/// # Example
///
/// ```
/// use hc_crypto::config::CryptoConfig;
/// use hc_crypto::vault::Vault;
///
/// # fn main() -> Result<(), hc_crypto::error::Error> {
/// let key = "a".repeat(64);
/// let vault = Vault::with_config(&key, CryptoConfig::default().with_iterations(1_000))?;
///
/// let ciphertext = vault.encrypt("alice@example.com", "email")?;
/// assert!(ciphertext.starts_with("hc1:"));
///
/// let plaintext = vault.decrypt(&ciphertext, "email")?;
/// assert_eq!(plaintext, "alice@example.com");
/// # Ok(())
/// # }
/// ```
pub struct Vault {
    keys: Arc<FieldKeyDeriver>,
    cipher_mode: CipherMode,
    index_algorithm: IndexAlgorithm,
}

impl Vault {
    /// Creates a Vault from a hex-encoded master key with default settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the key is empty, not 64 characters
    /// long, or not valid hex.
    pub fn new(master_key_hex: &str) -> Result<Self, Error> {
        Self::with_config(master_key_hex, CryptoConfig::default())
    }

    /// Creates a Vault from a hex-encoded master key and explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the key is invalid or the config
    /// fails validation.
    pub fn with_config(master_key_hex: &str, config: CryptoConfig) -> Result<Self, Error> {
        let master_key = MasterKey::from_hex(master_key_hex)?;
        Self::from_master_key(master_key, config)
    }

    /// Creates a Vault from an already parsed master key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the config fails validation.
    pub fn from_master_key(master_key: MasterKey, config: CryptoConfig) -> Result<Self, Error> {
        config.validate()?;

        tracing::debug!(
            iterations = config.iterations(),
            cipher = ?config.cipher_mode(),
            index = ?config.index_algorithm(),
            "vault initialized"
        );

        Ok(Self {
            keys: Arc::new(FieldKeyDeriver::new(
                master_key,
                config.salt().as_bytes(),
                config.iterations(),
            )),
            cipher_mode: config.cipher_mode(),
            index_algorithm: config.index_algorithm(),
        })
    }

    /// Encrypts `plaintext` under the key for `field`.
    ///
    /// Empty input yields an empty string. Input that already carries the
    /// envelope prefix is returned unchanged, so repeated calls never
    /// double-wrap a value.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &str, field: &str) -> Result<String, Error> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        if envelope::is_encrypted(plaintext) {
            tracing::trace!(field, "value already encrypted, skipping");
            return Ok(plaintext.to_owned());
        }

        let key = self.keys.derive(field);

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = match self.cipher_mode {
            CipherMode::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(key.expose_secret())
                    .map_err(|e| Error::EncryptionFailed(format!("invalid field key: {e}")))?;

                cipher
                    .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
                    .map_err(|e| Error::EncryptionFailed(format!("AES-256-GCM encryption failed: {e}")))?
            }
        };

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);

        Ok(Envelope::new(nonce, tag_bytes, buffer).encode())
    }

    /// Decrypts an envelope produced by [`Vault::encrypt`] for the same field.
    ///
    /// Empty input yields an empty string. Input without the envelope prefix
    /// is treated as legacy plaintext and returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecryptionFailed` for every failure: malformed or
    /// truncated envelope, unsupported version, wrong field, tampering, or a
    /// plaintext that is not UTF-8.
    pub fn decrypt(&self, value: &str, field: &str) -> Result<String, Error> {
        if value.is_empty() {
            return Ok(String::new());
        }

        if !envelope::is_encrypted(value) {
            tracing::trace!(field, "value not encrypted, passing through");
            return Ok(value.to_owned());
        }

        let envelope = Envelope::decode(value)?;
        let key = self.keys.derive(field);

        let nonce = *envelope.nonce();
        let tag = *envelope.tag();
        let mut buffer = Zeroizing::new(envelope.into_ciphertext());

        match self.cipher_mode {
            CipherMode::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(key.expose_secret())
                    .map_err(|_| Error::DecryptionFailed)?;

                cipher
                    .decrypt_in_place_detached(
                        Nonce::from_slice(&nonce),
                        b"",
                        &mut buffer,
                        Tag::from_slice(&tag),
                    )
                    .map_err(|_| {
                        tracing::debug!(field, "envelope rejected: authentication failed");
                        Error::DecryptionFailed
                    })?;
            }
        }

        String::from_utf8(std::mem::take(&mut *buffer)).map_err(|_| Error::DecryptionFailed)
    }

    /// Computes the blind index of `plaintext` for `field`.
    ///
    /// The value is normalized with [`blind_index::normalize`] first, so
    /// `" Test@EXAMPLE.com "` and `"test@example.com"` index identically.
    /// Empty input yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexGenerationFailed` if the keyed hash cannot be
    /// initialized.
    pub fn blind_index(&self, plaintext: &str, field: &str) -> Result<String, Error> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let normalized = Zeroizing::new(blind_index::normalize(plaintext));
        let key = self.keys.derive(&blind_index::index_field(field));

        blind_index::compute(self.index_algorithm, key.expose_secret(), &normalized)
    }

    /// Returns `true` if `value` looks like an envelope. See
    /// [`envelope::is_encrypted`].
    #[must_use]
    pub fn is_encrypted(&self, value: &str) -> bool {
        envelope::is_encrypted(value)
    }

    /// Number of field keys currently cached, index keys included.
    #[must_use]
    pub fn cached_keys(&self) -> usize {
        self.keys.cached_fields()
    }
}

impl Clone for Vault {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            cipher_mode: self.cipher_mode,
            index_algorithm: self.index_algorithm,
        }
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("keys", &self.keys)
            .field("cipher_mode", &self.cipher_mode)
            .field("index_algorithm", &self.index_algorithm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    const TEST_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn test_vault() -> Vault {
        Vault::with_config(TEST_KEY, CryptoConfig::default().with_iterations(1000)).unwrap()
    }

    #[test]
    fn test_vault_encrypt_decrypt_round_trip() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("test@example.com", "email").expect("Encryption failed");
        let decrypted = vault.decrypt(&ciphertext, "email").expect("Decryption failed");

        assert!(ciphertext.starts_with("hc1:"));
        assert_eq!(decrypted, "test@example.com");
    }

    #[test]
    fn test_vault_unicode_round_trip() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("Иван Иванов", "name").unwrap();
        assert_eq!(vault.decrypt(&ciphertext, "name").unwrap(), "Иван Иванов");
    }

    #[test]
    fn test_vault_large_plaintext() {
        let vault = test_vault();
        let plaintext = "A".repeat(10_000);

        let ciphertext = vault.encrypt(&plaintext, "data").unwrap();
        assert_eq!(vault.decrypt(&ciphertext, "data").unwrap(), plaintext);
    }

    #[test]
    fn test_vault_empty_input() {
        let vault = test_vault();

        assert_eq!(vault.encrypt("", "email").unwrap(), "");
        assert_eq!(vault.decrypt("", "email").unwrap(), "");
        assert_eq!(vault.blind_index("", "email").unwrap(), "");
        assert_eq!(vault.cached_keys(), 0);
    }

    #[test]
    fn test_vault_envelope_layout() {
        let vault = test_vault();
        let plaintext = "test@example.com";

        let ciphertext = vault.encrypt(plaintext, "email").unwrap();
        let packed = STANDARD.decode(&ciphertext[4..]).unwrap();

        assert_eq!(packed[0], 0x01);
        assert_eq!(packed.len(), 1 + 12 + 16 + plaintext.len());
    }

    #[test]
    fn test_vault_idempotent_encrypt() {
        let vault = test_vault();

        let once = vault.encrypt("test", "email").unwrap();
        let twice = vault.encrypt(&once, "email").unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_vault_plaintext_passthrough() {
        let vault = test_vault();
        assert_eq!(vault.decrypt("not-encrypted", "email").unwrap(), "not-encrypted");
        assert_eq!(vault.cached_keys(), 0);
    }

    #[test]
    fn test_vault_random_nonce() {
        let vault = test_vault();

        let ciphertext1 = vault.encrypt("test@example.com", "email").unwrap();
        let ciphertext2 = vault.encrypt("test@example.com", "email").unwrap();

        assert_ne!(ciphertext1, ciphertext2);
        assert_eq!(vault.decrypt(&ciphertext1, "email").unwrap(), "test@example.com");
        assert_eq!(vault.decrypt(&ciphertext2, "email").unwrap(), "test@example.com");
    }

    #[test]
    fn test_vault_wrong_field_fails() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("test@example.com", "email").unwrap();
        let result = vault.decrypt(&ciphertext, "phone");

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_vault_tampered_ciphertext_fails() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("test@example.com", "email").unwrap();
        let mut packed = STANDARD.decode(&ciphertext[4..]).unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0xFF;
        let tampered = format!("hc1:{}", STANDARD.encode(&packed));

        assert!(matches!(vault.decrypt(&tampered, "email"), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_vault_tampered_tag_fails() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("test@example.com", "email").unwrap();
        let mut packed = STANDARD.decode(&ciphertext[4..]).unwrap();
        packed[20] ^= 0x01;
        let tampered = format!("hc1:{}", STANDARD.encode(&packed));

        assert!(matches!(vault.decrypt(&tampered, "email"), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_vault_malformed_envelopes_fail_uniformly() {
        let vault = test_vault();

        let short = format!("hc1:{}", STANDARD.encode([1u8; 10]));
        let mut wrong_version = vec![2u8];
        wrong_version.extend_from_slice(&[0u8; 40]);
        let wrong_version = format!("hc1:{}", STANDARD.encode(&wrong_version));

        for bad in ["hc1:", "hc1:!!!!", short.as_str(), wrong_version.as_str()] {
            let err = vault.decrypt(bad, "email").unwrap_err();
            assert!(matches!(err, Error::DecryptionFailed));
            assert_eq!(err.to_string(), "decryption failed");
        }
    }

    #[test]
    fn test_vault_blind_index() {
        let vault = test_vault();

        let index1 = vault.blind_index("test@example.com", "email").unwrap();
        let index2 = vault.blind_index(" Test@EXAMPLE.com ", "email").unwrap();
        let other_field = vault.blind_index("test@example.com", "phone").unwrap();

        assert_eq!(index1, index2);
        assert_eq!(index1.len(), 64);
        assert_ne!(index1, other_field);
    }

    #[test]
    fn test_vault_blind_index_uses_separate_key() {
        let vault = test_vault();

        vault.encrypt("x", "email").unwrap();
        vault.blind_index("x", "email").unwrap();

        assert_eq!(vault.cached_keys(), 2);
    }

    #[test]
    fn test_vault_is_encrypted() {
        let vault = test_vault();
        let ciphertext = vault.encrypt("x", "email").unwrap();

        assert!(vault.is_encrypted(&ciphertext));
        assert!(!vault.is_encrypted("plain"));
        assert!(!vault.is_encrypted(""));
    }

    #[test]
    fn test_vault_clone_shares_cache() {
        let vault1 = test_vault();
        let vault2 = vault1.clone();

        let ciphertext = vault1.encrypt("test", "email").unwrap();
        assert_eq!(vault2.cached_keys(), 1);
        assert_eq!(vault2.decrypt(&ciphertext, "email").unwrap(), "test");
    }

    #[test]
    fn test_vault_invalid_keys() {
        assert!(matches!(Vault::new(""), Err(Error::Configuration(_))));
        assert!(matches!(Vault::new(&"a".repeat(32)), Err(Error::Configuration(_))));
        assert!(matches!(Vault::new(&"g".repeat(64)), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_vault_zero_iterations_rejected() {
        let result = Vault::with_config(TEST_KEY, CryptoConfig::default().with_iterations(0));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_vault_default_field() {
        let vault = test_vault();

        let ciphertext = vault.encrypt("value", DEFAULT_FIELD).unwrap();
        assert_eq!(vault.decrypt(&ciphertext, "default").unwrap(), "value");
    }

    #[test]
    fn test_vault_debug_hides_keys() {
        let vault = test_vault();
        let debug = format!("{vault:?}");
        assert!(!debug.contains(TEST_KEY));
    }
}
