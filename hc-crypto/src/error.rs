//! Error types for `hc-crypto` operations.

/// Main error type for `hc-crypto` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine could not be constructed (missing or malformed master key,
    /// invalid work factor).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed.
    ///
    /// Truncated envelopes, unknown versions, bad base64, a wrong field key and
    /// tag mismatches all map here. The variant carries no detail so callers
    /// cannot tell the causes apart.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Blind index generation failed
    #[error("blind index generation failed: {0}")]
    IndexGenerationFailed(String),

    /// A legacy decryptor was used without key material.
    #[error("legacy decryptor not configured")]
    LegacyNotConfigured,
}
