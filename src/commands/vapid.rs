//! VAPID keypair generation and key checks.

use anyhow::Result;

use crate::notifications::{decode_application_server_key, VapidKeys};

/// Generate a keypair and print both halves.
///
/// The public key goes into `CHARTER_PUSH_VAPID_PUBLIC_KEY` (or the config
/// file); the private key belongs to the backend that sends pushes.
pub fn generate() -> Result<VapidKeys> {
    let keys = VapidKeys::generate()?;
    println!("public:  {}", keys.public_key_base64url());
    println!("private: {}", keys.private_key_base64url());
    Ok(keys)
}

/// Validate an application server key (defaults to the configured one).
pub fn check(key: &str) -> Result<()> {
    anyhow::ensure!(
        !key.is_empty(),
        "No application server key configured (set CHARTER_PUSH_VAPID_PUBLIC_KEY)"
    );
    decode_application_server_key(key)?;
    println!("Application server key is a valid P-256 public key");
    Ok(())
}
