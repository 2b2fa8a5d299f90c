//! Per-field key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every logical field ("email", "phone", ...) gets its own 256-bit key derived
//! from the master key. The salt is `configured_salt || ":" || field`, so two
//! fields never share a key and a compromise of one field key exposes nothing
//! about the others.

use crate::master_key::MasterKey;
use parking_lot::RwLock;
use secrecy::SecretVec;
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Derived field key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Derives a field key from raw key material.
///
/// Computes `PBKDF2-HMAC-SHA256(password, salt || ":" || field, iterations)`
/// with a 32-byte output.
///
/// # Example
///
/// ```
/// use hc_crypto::kdf::{derive_field_key, KEY_SIZE};
/// use secrecy::ExposeSecret;
///
/// let key = derive_field_key(&[0xaa; 32], b"housler_crypto_v1", "email", 1_000);
/// assert_eq!(key.expose_secret().len(), KEY_SIZE);
/// ```
#[must_use]
pub fn derive_field_key(password: &[u8], salt: &[u8], field: &str, iterations: u32) -> SecretVec<u8> {
    let mut field_salt = Vec::with_capacity(salt.len() + 1 + field.len());
    field_salt.extend_from_slice(salt);
    field_salt.push(b':');
    field_salt.extend_from_slice(field.as_bytes());

    derive_raw(password, &field_salt, iterations)
}

/// PBKDF2-HMAC-SHA256 with a 32-byte output and a caller-built salt.
pub(crate) fn derive_raw(password: &[u8], salt: &[u8], iterations: u32) -> SecretVec<u8> {
    let mut key = vec![0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    SecretVec::new(key)
}

/// Derives and memoizes field keys for one master key and configuration.
///
/// The cache is keyed by the exact field string and lives as long as the
/// deriver. It is an optimization only: a miss recomputes the same key, and
/// two threads racing on an unseen field both insert identical values.
pub struct FieldKeyDeriver {
    master_key: MasterKey,
    salt: Vec<u8>,
    iterations: u32,
    cache: RwLock<HashMap<String, Arc<SecretVec<u8>>>>,
}

impl FieldKeyDeriver {
    /// Creates a deriver over the given master key.
    #[must_use]
    pub fn new(master_key: MasterKey, salt: impl Into<Vec<u8>>, iterations: u32) -> Self {
        Self { master_key, salt: salt.into(), iterations, cache: RwLock::new(HashMap::new()) }
    }

    /// Returns the key for `field`, deriving it on first use.
    pub fn derive(&self, field: &str) -> Arc<SecretVec<u8>> {
        if let Some(key) = self.cache.read().get(field) {
            return Arc::clone(key);
        }

        // PBKDF2 runs outside the lock; concurrent misses for the same field
        // compute the same bytes and the last insert wins.
        tracing::debug!(field, iterations = self.iterations, "deriving field key");
        let key = Arc::new(derive_field_key(
            self.master_key.expose(),
            &self.salt,
            field,
            self.iterations,
        ));

        self.cache.write().insert(field.to_owned(), Arc::clone(&key));
        key
    }

    /// Number of distinct fields with a cached key.
    #[must_use]
    pub fn cached_fields(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns the configured iteration count.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl fmt::Debug for FieldKeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKeyDeriver")
            .field("salt", &String::from_utf8_lossy(&self.salt))
            .field("iterations", &self.iterations)
            .field("cached_fields", &self.cached_fields())
            .finish_non_exhaustive()
    }
}
