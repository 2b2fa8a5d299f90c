//! Blind index generation for searchable encryption.
//!
//! A blind index is a keyed, deterministic digest of a normalized value. It is
//! stored next to the encrypted column and lets the application run equality
//! lookups (`WHERE email_hash = ?`) without decrypting anything.
//!
//! The index key for a field is the field key of `field + ":blind_index"`, so
//! it never coincides with the encryption key of the same field.

use crate::config::IndexAlgorithm;
use crate::error::Error;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Blind index digest size in bytes. Hex output is twice as long.
pub const BLIND_INDEX_SIZE: usize = 32;

/// Suffix appended to the field name to obtain the index key.
pub const BLIND_INDEX_SUFFIX: &str = ":blind_index";

/// Returns the key-derivation identifier for a field's index key.
#[must_use]
pub fn index_field(field: &str) -> String {
    format!("{field}{BLIND_INDEX_SUFFIX}")
}

/// Canonicalizes a value before hashing: lowercase, then trim surrounding
/// whitespace.
///
/// Callers must hand raw values to the index; pre-normalizing them some other
/// way makes lookups diverge from stored indexes.
///
/// ```
/// use hc_crypto::blind_index::normalize;
///
/// assert_eq!(normalize("  Test@EXAMPLE.com "), "test@example.com");
/// ```
#[must_use]
pub fn normalize(value: &str) -> String {
    value.to_lowercase().trim().to_owned()
}

/// Computes the keyed digest of an already-normalized value, hex-encoded.
///
/// # Errors
///
/// Returns `Error::IndexGenerationFailed` if the key cannot initialize the
/// keyed hash.
pub fn compute(algorithm: IndexAlgorithm, key: &[u8], normalized: &str) -> Result<String, Error> {
    match algorithm {
        IndexAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key)
                .map_err(|e| Error::IndexGenerationFailed(format!("invalid index key: {e}")))?;
            mac.update(normalized.as_bytes());
            let digest = mac.finalize().into_bytes();

            debug_assert_eq!(digest.len(), BLIND_INDEX_SIZE);
            Ok(hex::encode(digest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize(" Test@EXAMPLE.com "), "test@example.com");
        assert_eq!(normalize("\tALICE\n"), "alice");
        assert_eq!(normalize("already"), "already");
    }

    #[test]
    fn test_normalize_unicode() {
        assert_eq!(normalize(" ИВАН Иванов "), "иван иванов");
    }

    #[test]
    fn test_normalize_keeps_inner_whitespace() {
        assert_eq!(normalize("  John   Smith "), "john   smith");
    }

    #[test]
    fn test_index_field() {
        assert_eq!(index_field("email"), "email:blind_index");
    }

    #[test]
    fn test_compute_deterministic() {
        let key = [42u8; 32];
        let index1 = compute(IndexAlgorithm::HmacSha256, &key, "alice@example.com").unwrap();
        let index2 = compute(IndexAlgorithm::HmacSha256, &key, "alice@example.com").unwrap();

        assert_eq!(index1, index2);
        assert_eq!(index1.len(), BLIND_INDEX_SIZE * 2);
        assert!(index1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_compute_different_values() {
        let key = [42u8; 32];
        let index1 = compute(IndexAlgorithm::HmacSha256, &key, "alice@example.com").unwrap();
        let index2 = compute(IndexAlgorithm::HmacSha256, &key, "bob@example.com").unwrap();

        assert_ne!(index1, index2);
    }

    #[test]
    fn test_compute_different_keys() {
        let index1 = compute(IndexAlgorithm::HmacSha256, &[1u8; 32], "alice").unwrap();
        let index2 = compute(IndexAlgorithm::HmacSha256, &[2u8; 32], "alice").unwrap();

        assert_ne!(index1, index2);
    }

    // RFC 4231 test case 2.
    #[test]
    fn test_hmac_sha256_rfc4231_case_2() {
        const EXPECTED_HEX: &str =
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";

        let index =
            compute(IndexAlgorithm::HmacSha256, b"Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(index, EXPECTED_HEX);
    }
}
