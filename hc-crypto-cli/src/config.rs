//! Environment-driven settings for the `hc-crypto` binary.

use anyhow::{Context, Result};
use hc_crypto::config::{CryptoConfig, DEFAULT_ITERATIONS, DEFAULT_SALT};
use hc_crypto::master_key::MasterKey;
use hc_crypto::vault::Vault;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Settings read from `HC_CRYPTO_*` environment variables.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Hex-encoded 32-byte master key. Only required by commands that touch
    /// ciphertext or indexes.
    #[serde(default)]
    pub master_key: Option<SecretString>,

    #[serde(default = "default_salt")]
    pub salt: String,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_salt() -> String {
    DEFAULT_SALT.into()
}
fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_log_level() -> String {
    "info".into()
}

impl Settings {
    /// Load settings from the environment and validate them.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("HC_CRYPTO"))
            .build()
            .context("failed to read HC_CRYPTO_* environment")?;

        let settings: Self = cfg
            .try_deserialize()
            .context("failed to parse HC_CRYPTO_* environment")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, salt: Option<String>, iterations: Option<u32>) -> Result<Self> {
        if let Some(salt) = salt {
            self.salt = salt;
        }
        if let Some(iterations) = iterations {
            self.iterations = iterations;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            anyhow::bail!("HC_CRYPTO_ITERATIONS must be greater than zero");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("HC_CRYPTO_LOG_LEVEL must not be empty");
        }
        Ok(())
    }

    /// Build a [`Vault`] from the configured master key, salt and iterations.
    pub fn vault(&self) -> Result<Vault> {
        let hex_key = self
            .master_key
            .as_ref()
            .context("HC_CRYPTO_MASTER_KEY is required for this command")?;

        let master_key =
            MasterKey::from_hex(hex_key.expose_secret()).context("HC_CRYPTO_MASTER_KEY is invalid")?;
        let config = CryptoConfig::default()
            .with_salt(self.salt.clone())
            .with_iterations(self.iterations);

        Vault::from_master_key(master_key, config).context("failed to initialise vault")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn settings(master_key: Option<&str>) -> Settings {
        Settings {
            master_key: master_key.map(|k| SecretString::new(k.to_owned())),
            salt: default_salt(),
            iterations: 1000,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_salt(), "housler_crypto_v1");
        assert_eq!(default_iterations(), 100_000);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let mut cfg = settings(Some(TEST_KEY));
        cfg.iterations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_log_level() {
        let mut cfg = settings(None);
        cfg.log_level = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_environment_values() {
        let cfg = settings(None).with_overrides(Some("other_v1".into()), Some(2000)).unwrap();
        assert_eq!(cfg.salt, "other_v1");
        assert_eq!(cfg.iterations, 2000);

        assert!(settings(None).with_overrides(None, Some(0)).is_err());
    }

    #[test]
    fn vault_requires_master_key() {
        let err = settings(None).vault().unwrap_err();
        assert!(err.to_string().contains("HC_CRYPTO_MASTER_KEY"));
    }

    #[test]
    fn vault_rejects_malformed_master_key() {
        assert!(settings(Some("abcd")).vault().is_err());
    }

    #[test]
    fn vault_uses_configured_salt() {
        let vault = settings(Some(TEST_KEY)).vault().unwrap();
        let ciphertext = vault.encrypt("test", "email").unwrap();

        let mut other = settings(Some(TEST_KEY));
        other.salt = "other_v1".into();
        assert!(other.vault().unwrap().decrypt(&ciphertext, "email").is_err());
    }

    #[test]
    fn debug_redacts_master_key() {
        let rendered = format!("{:?}", settings(Some(TEST_KEY)));
        assert!(!rendered.contains(TEST_KEY));
    }
}
