//! # `hc-crypto`
//!
//! Field-scoped PII encryption with a versioned envelope format and blind
//! indexes for equality search.
//!
//! ## Features
//!
//! - AES-256-GCM authenticated encryption with a fresh random nonce per value
//! - Per-field keys derived from one master key (PBKDF2-HMAC-SHA256)
//! - Blind indexes (HMAC-SHA256 over normalized values) for searchable columns
//! - Idempotent encryption and plaintext pass-through for gradual migration
//! - Migration of legacy Fernet-encrypted values
//!
//! ## Wire format
//!
//! ```text
//! "hc1:" + base64( 0x01 || nonce[12] || tag[16] || ciphertext )
//! ```
//!
//! The format is shared with other implementations of the same scheme, so
//! envelopes and blind indexes are interchangeable across them given the same
//! master key, salt and iteration count.
//!
//! ## Example
//!
//! ```rust
//! use hc_crypto::prelude::*;
//!
//! # fn main() -> Result<(), Error> {
//! let vault = Vault::with_config(&generate_key(), CryptoConfig::default().with_iterations(1_000))?;
//!
//! let ciphertext = vault.encrypt("alice@example.com", "email")?;
//! let plaintext = vault.decrypt(&ciphertext, "email")?;
//! let lookup = vault.blind_index("Alice@Example.com", "email")?;
//!
//! assert_eq!(plaintext, "alice@example.com");
//! assert_eq!(lookup.len(), 64);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blind_index;
pub mod config;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod legacy;
pub mod master_key;
pub mod vault;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::config::{CipherMode, CryptoConfig, IndexAlgorithm};
    pub use crate::envelope::is_encrypted;
    pub use crate::error::Error;
    pub use crate::legacy::LegacyDecryptor;
    pub use crate::master_key::{generate_key, MasterKey};
    pub use crate::vault::{Vault, DEFAULT_FIELD};
}
