//! Migration from legacy Fernet-encrypted columns.
//!
//! Older datasets hold Fernet tokens produced under one of two key layouts:
//!
//! - **single key**: one Fernet key for every field,
//!   `PBKDF2-HMAC-SHA256(key, salt, 100_000)`
//! - **per field**: one Fernet key per field,
//!   `PBKDF2-HMAC-SHA256(master, salt || field, 100_000)`, with values
//!   optionally stored behind an `"enc:"` prefix
//!
//! [`LegacyDecryptor::migrate`] opens such a value and re-encrypts it into the
//! current envelope format. Values that are not valid Fernet tokens are
//! treated as plaintext, so a column can be migrated in one pass regardless of
//! which rows were ever encrypted.

use crate::error::Error;
use crate::kdf::derive_raw;
use crate::vault::Vault;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// PBKDF2 work factor used by both legacy layouts.
pub const LEGACY_ITERATIONS: u32 = 100_000;

/// Prefix some legacy values carry in the per-field layout.
pub const LEGACY_PREFIX: &str = "enc:";

const FERNET_VERSION: u8 = 0x80;
const FERNET_IV_SIZE: usize = 16;
const FERNET_HMAC_SIZE: usize = 32;
const FERNET_BLOCK_SIZE: usize = 16;
// version + timestamp + iv
const FERNET_HEADER_SIZE: usize = 1 + 8 + FERNET_IV_SIZE;

/// A 32-byte Fernet key: signing half then encryption half.
struct FernetKey(SecretVec<u8>);

impl FernetKey {
    fn signing_key(&self) -> &[u8] {
        &self.0.expose_secret()[..16]
    }

    fn encryption_key(&self) -> &[u8] {
        &self.0.expose_secret()[16..]
    }

    /// Verifies and decrypts a token. `None` means "not a token for this key".
    fn open(&self, token: &str) -> Option<Zeroizing<Vec<u8>>> {
        let data = URL_SAFE.decode(token.trim()).ok()?;

        if data.len() < FERNET_HEADER_SIZE + FERNET_BLOCK_SIZE + FERNET_HMAC_SIZE
            || data[0] != FERNET_VERSION
        {
            return None;
        }

        let (signed, signature) = data.split_at(data.len() - FERNET_HMAC_SIZE);
        let mut mac = HmacSha256::new_from_slice(self.signing_key()).ok()?;
        mac.update(signed);
        mac.verify_slice(signature).ok()?;

        let iv = &signed[1 + 8..FERNET_HEADER_SIZE];
        let ciphertext = &signed[FERNET_HEADER_SIZE..];
        if ciphertext.len() % FERNET_BLOCK_SIZE != 0 {
            return None;
        }

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        let plaintext_len = Aes128CbcDec::new_from_slices(self.encryption_key(), iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buffer)
            .ok()?
            .len();
        buffer.truncate(plaintext_len);

        Some(buffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyLayout {
    Unconfigured,
    SingleKey,
    PerField,
}

/// Opens legacy Fernet values and re-encrypts them for a [`Vault`].
///
/// Fernet keys are derived on first use and memoized, one entry for the
/// single-key layout and one per field otherwise.
///
/// # Example
///
/// ```
/// use hc_crypto::config::CryptoConfig;
/// use hc_crypto::legacy::LegacyDecryptor;
/// use hc_crypto::vault::Vault;
///
/// # fn main() -> Result<(), hc_crypto::error::Error> {
/// let legacy = LegacyDecryptor::single_key(&"b".repeat(64), "old_salt")?.with_iterations(1_000);
/// let vault = Vault::with_config(&"a".repeat(64), CryptoConfig::default().with_iterations(1_000))?;
///
/// // Rows that were never encrypted are migrated as plaintext.
/// let migrated = legacy.migrate("alice@example.com", "email", &vault)?;
/// assert_eq!(vault.decrypt(&migrated, "email")?, "alice@example.com");
/// # Ok(())
/// # }
/// ```
pub struct LegacyDecryptor {
    layout: KeyLayout,
    key_material: SecretVec<u8>,
    salt: Vec<u8>,
    iterations: u32,
    cache: RwLock<HashMap<String, Arc<FernetKey>>>,
}

impl LegacyDecryptor {
    /// A decryptor without key material; every decrypt fails with
    /// `Error::LegacyNotConfigured`.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::build(KeyLayout::Unconfigured, Vec::new(), "")
    }

    /// Single-key layout: one Fernet key derived from `key_hex` and `salt`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `key_hex` is empty or not valid hex.
    pub fn single_key(key_hex: &str, salt: &str) -> Result<Self, Error> {
        Ok(Self::build(KeyLayout::SingleKey, decode_key(key_hex)?, salt))
    }

    /// Per-field layout: a Fernet key per field derived from `master_key_hex`
    /// and `salt || field`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `master_key_hex` is empty or not
    /// valid hex.
    pub fn per_field(master_key_hex: &str, salt: &str) -> Result<Self, Error> {
        Ok(Self::build(KeyLayout::PerField, decode_key(master_key_hex)?, salt))
    }

    fn build(layout: KeyLayout, key_material: Vec<u8>, salt: &str) -> Self {
        Self {
            layout,
            key_material: SecretVec::new(key_material),
            salt: salt.as_bytes().to_vec(),
            iterations: LEGACY_ITERATIONS,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Overrides the PBKDF2 work factor, for legacy deployments that did not
    /// use the standard count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self.cache.get_mut().clear();
        self
    }

    /// Returns `true` unless built with [`LegacyDecryptor::unconfigured`].
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.layout != KeyLayout::Unconfigured
    }

    /// Decrypts a legacy value for `field`.
    ///
    /// Empty input yields an empty string. A value that does not verify as a
    /// Fernet token under the field's key is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::LegacyNotConfigured` if the decryptor has no key, and
    /// `Error::DecryptionFailed` if an authentic token holds non-UTF-8 data.
    pub fn decrypt(&self, value: &str, field: &str) -> Result<String, Error> {
        if value.is_empty() {
            return Ok(String::new());
        }

        let token = match self.layout {
            KeyLayout::Unconfigured => return Err(Error::LegacyNotConfigured),
            KeyLayout::SingleKey => value,
            KeyLayout::PerField => value.strip_prefix(LEGACY_PREFIX).unwrap_or(value),
        };

        match self.fernet_key(field).open(token) {
            Some(mut plaintext) => {
                String::from_utf8(std::mem::take(&mut *plaintext)).map_err(|_| Error::DecryptionFailed)
            }
            None => {
                tracing::trace!(field, "not a legacy token, treating as plaintext");
                Ok(value.to_owned())
            }
        }
    }

    /// Re-encrypts a legacy value into the envelope format of `vault`.
    ///
    /// Empty input yields an empty string and values already in envelope
    /// format are returned unchanged.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`LegacyDecryptor::decrypt`] and
    /// [`Vault::encrypt`].
    pub fn migrate(&self, value: &str, field: &str, vault: &Vault) -> Result<String, Error> {
        if value.is_empty() {
            return Ok(String::new());
        }

        if vault.is_encrypted(value) {
            return Ok(value.to_owned());
        }

        let plaintext = Zeroizing::new(self.decrypt(value, field)?);
        vault.encrypt(&plaintext, field)
    }

    fn fernet_key(&self, field: &str) -> Arc<FernetKey> {
        // The single-key layout shares one entry across all fields.
        let cache_key = if self.layout == KeyLayout::PerField { field } else { "" };

        if let Some(key) = self.cache.read().get(cache_key) {
            return Arc::clone(key);
        }

        tracing::debug!(field = cache_key, iterations = self.iterations, "deriving legacy key");
        let mut salt = self.salt.clone();
        salt.extend_from_slice(cache_key.as_bytes());
        let key = Arc::new(FernetKey(derive_raw(
            self.key_material.expose_secret(),
            &salt,
            self.iterations,
        )));

        self.cache.write().insert(cache_key.to_owned(), Arc::clone(&key));
        key
    }
}

impl Default for LegacyDecryptor {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl fmt::Debug for LegacyDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyDecryptor")
            .field("layout", &self.layout)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

fn decode_key(key_hex: &str) -> Result<Vec<u8>, Error> {
    if key_hex.is_empty() {
        return Err(Error::Configuration("legacy key is required".to_string()));
    }
    hex::decode(key_hex).map_err(|e| Error::Configuration(format!("invalid legacy key: {e}")))
}
