//! VAPID application server keys (RFC 8292).
//!
//! The backend signs pushes with the private half; the foreground hands the
//! public half to the platform as the `applicationServerKey` when it creates
//! a subscription, which scopes the subscription to this application.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;

/// Length of an uncompressed SEC1 P-256 point (0x04 || x || y).
const UNCOMPRESSED_POINT_LEN: usize = 65;

/// VAPID keypair.
///
/// The private key is the raw 32-byte P-256 scalar (base64url), which is the
/// format push senders expect. The public key is the uncompressed SEC1 point.
#[derive(Debug)]
pub struct VapidKeys {
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key_b64: String,
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key_b64: String,
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Result<Self> {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);

        Ok(Self {
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        })
    }

    /// Base64url-encoded uncompressed public key.
    ///
    /// This is what goes into `Config::application_server_key`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded raw private key scalar. Belongs on the push sender only.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }

    /// Uncompressed public key bytes (65 bytes).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        decode_application_server_key(&self.public_key_b64)
    }
}

/// Decode and validate a base64url application server key.
///
/// The key must be a 65-byte uncompressed point that lies on P-256.
pub fn decode_application_server_key(public_key_b64: &str) -> Result<Vec<u8>> {
    let bytes = BASE64URL
        .decode(public_key_b64.trim_end_matches('='))
        .context("Invalid base64url for VAPID public key")?;
    anyhow::ensure!(
        bytes.len() == UNCOMPRESSED_POINT_LEN && bytes[0] == 0x04,
        "VAPID public key must be 65-byte uncompressed P-256 point"
    );
    p256::PublicKey::from_sec1_bytes(&bytes)
        .context("VAPID public key is not a point on P-256")?;
    Ok(bytes)
}
