//! `hc-crypto` command-line tool for field encryption and blind indexes.
//!
//! The master key, salt and work factor come from `HC_CRYPTO_*` environment
//! variables; `--salt` and `--iterations` override them per invocation.

#![warn(clippy::pedantic, clippy::nursery)]

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hc_crypto::envelope::is_encrypted;
use hc_crypto::master_key::generate_key;
use hc_crypto::vault::DEFAULT_FIELD;
use tracing::debug;

#[derive(Parser)]
#[command(name = "hc-crypto")]
#[command(about = "Encrypt PII fields and compute blind indexes", long_about = None)]
struct Cli {
    /// Override `HC_CRYPTO_SALT`
    #[arg(long, global = true)]
    salt: Option<String>,

    /// Override `HC_CRYPTO_ITERATIONS`
    #[arg(long, global = true)]
    iterations: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FieldValue {
    /// Field name the key is scoped to
    #[arg(short, long, default_value = DEFAULT_FIELD)]
    field: String,

    /// Input value
    value: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random master key
    Keygen,
    /// Encrypt a value into an hc1 envelope
    Encrypt(FieldValue),
    /// Decrypt an hc1 envelope (plaintext is passed through)
    Decrypt(FieldValue),
    /// Compute the blind index of a value
    BlindIndex(FieldValue),
    /// Report whether a value is in hc1 envelope format
    Check {
        /// Input value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::Settings::from_env()
        .and_then(|s| s.with_overrides(cli.salt, cli.iterations))
        .map_err(|e| {
            eprintln!("ERROR: hc-crypto configuration invalid: {e:#}");
            e
        })?;

    telemetry::init(&settings.log_level)?;
    debug!(salt = %settings.salt, iterations = settings.iterations, "settings loaded");

    match cli.command {
        Commands::Keygen => {
            println!("{}", generate_key());
        }
        Commands::Encrypt(FieldValue { field, value }) => {
            let vault = settings.vault()?;
            let envelope = vault
                .encrypt(&value, &field)
                .with_context(|| format!("failed to encrypt value for field '{field}'"))?;
            println!("{envelope}");
        }
        Commands::Decrypt(FieldValue { field, value }) => {
            let vault = settings.vault()?;
            let plaintext = vault
                .decrypt(&value, &field)
                .with_context(|| format!("failed to decrypt value for field '{field}'"))?;
            println!("{plaintext}");
        }
        Commands::BlindIndex(FieldValue { field, value }) => {
            let vault = settings.vault()?;
            let index = vault
                .blind_index(&value, &field)
                .with_context(|| format!("failed to compute blind index for field '{field}'"))?;
            println!("{index}");
        }
        Commands::Check { value } => {
            let state = if is_encrypted(&value) { "encrypted" } else { "plaintext" };
            println!("{state}");
        }
    }

    Ok(())
}
