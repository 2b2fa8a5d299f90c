//! Versioned envelope format for encrypted values.
//!
//! An envelope is the storable text form of one ciphertext:
//!
//! ```text
//! "hc1:" + base64( version[1] || nonce[12] || tag[16] || ciphertext[N] )
//! ```
//!
//! The header has a fixed size, so the ciphertext length is simply the decoded
//! length minus 29 bytes. The layout is shared with other implementations and
//! must stay byte-compatible.

use crate::error::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Text prefix that marks a value as encrypted.
pub const ENVELOPE_PREFIX: &str = "hc1:";

/// Version byte for AES-256-GCM envelopes.
pub const VERSION_AES_GCM: u8 = 0x01;

/// Nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Fixed header size: version + nonce + tag.
pub const HEADER_SIZE: usize = 1 + NONCE_SIZE + TAG_SIZE;

/// Returns `true` if `value` carries the envelope prefix.
///
/// Pure prefix check; the payload is not parsed, so a value that passes may
/// still fail to decrypt.
///
/// ```
/// use hc_crypto::envelope::is_encrypted;
///
/// assert!(is_encrypted("hc1:AQ=="));
/// assert!(!is_encrypted("plain"));
/// assert!(!is_encrypted(""));
/// ```
#[must_use]
pub fn is_encrypted(value: &str) -> bool {
    !value.is_empty() && value.starts_with(ENVELOPE_PREFIX)
}

/// A parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    version: u8,
    nonce: [u8; NONCE_SIZE],
    tag: [u8; TAG_SIZE],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Creates a version 1 envelope.
    #[must_use]
    pub const fn new(nonce: [u8; NONCE_SIZE], tag: [u8; TAG_SIZE], ciphertext: Vec<u8>) -> Self {
        Self { version: VERSION_AES_GCM, nonce, tag, ciphertext }
    }

    /// Returns the version byte.
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Returns the nonce.
    #[must_use]
    pub const fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Returns the authentication tag.
    #[must_use]
    pub const fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    /// Returns the ciphertext.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Consumes the envelope, returning the ciphertext buffer.
    #[must_use]
    pub fn into_ciphertext(self) -> Vec<u8> {
        self.ciphertext
    }

    /// Serializes to the binary packet (without prefix or base64).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.ciphertext.len());
        bytes.push(self.version);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.tag);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parses the binary packet.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecryptionFailed` if the data is shorter than the header
    /// or the version is not supported.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            tracing::debug!(len = data.len(), "envelope rejected: truncated");
            return Err(Error::DecryptionFailed);
        }

        let version = data[0];
        if version != VERSION_AES_GCM {
            tracing::debug!(version, "envelope rejected: unsupported version");
            return Err(Error::DecryptionFailed);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[1..=NONCE_SIZE]);

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&data[1 + NONCE_SIZE..HEADER_SIZE]);

        Ok(Self { version, nonce, tag, ciphertext: data[HEADER_SIZE..].to_vec() })
    }

    /// Renders the envelope as `"hc1:" + base64(packet)`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::from(ENVELOPE_PREFIX);
        STANDARD.encode_string(self.to_bytes(), &mut out);
        out
    }

    /// Parses the text form.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecryptionFailed` if the prefix is missing, the payload
    /// is not valid base64, or [`Envelope::from_bytes`] rejects it.
    pub fn decode(value: &str) -> Result<Self, Error> {
        let Some(encoded) = value.strip_prefix(ENVELOPE_PREFIX) else {
            return Err(Error::DecryptionFailed);
        };

        let packed = STANDARD.decode(encoded).map_err(|_| {
            tracing::debug!("envelope rejected: invalid base64");
            Error::DecryptionFailed
        })?;

        Self::from_bytes(&packed)
    }
}
