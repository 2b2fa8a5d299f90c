//! Basic usage example for `hc-crypto`.

use hc_crypto::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("hc-crypto Basic Usage Example");
    println!("=============================\n");

    // A real deployment reads this from a secret store.
    let master_key = generate_key();
    println!("Generated master key ({} hex chars)\n", master_key.len());

    // Lower work factor keeps the example fast; production uses the default.
    let config = CryptoConfig::default().with_iterations(10_000);
    let vault = Vault::with_config(&master_key, config)?;

    let email = "alice@example.com";
    let phone = "+7 999 123-45-67";

    let email_ct = vault.encrypt(email, "email")?;
    let phone_ct = vault.encrypt(phone, "phone")?;
    println!("email -> {email_ct}");
    println!("phone -> {phone_ct}\n");

    assert_eq!(vault.decrypt(&email_ct, "email")?, email);
    assert_eq!(vault.decrypt(&phone_ct, "phone")?, phone);
    println!("Round trip verified");

    // Keys are scoped per field.
    assert!(vault.decrypt(&email_ct, "phone").is_err());
    println!("Cross-field decryption rejected");

    // Already-encrypted values are left alone, plaintext passes through.
    assert_eq!(vault.encrypt(&email_ct, "email")?, email_ct);
    assert_eq!(vault.decrypt("not yet migrated", "email")?, "not yet migrated");
    println!("Idempotent encrypt and plaintext pass-through verified\n");

    // Blind index for lookups: case and surrounding whitespace don't matter.
    let stored = vault.blind_index(email, "email")?;
    let query = vault.blind_index("  Alice@EXAMPLE.com ", "email")?;
    assert_eq!(stored, query);
    println!("Blind index: {stored}");

    println!("is_encrypted(email_ct) = {}", is_encrypted(&email_ct));
    println!("is_encrypted(email)    = {}", is_encrypted(email));

    Ok(())
}
