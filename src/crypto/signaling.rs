//! Push notification signaling keys.
//!
//! The backend encrypts push payloads with the decryption key (AES-256) and
//! authenticates them with the verification key (HMAC-SHA256), so the
//! device can check a notification before any session is available.

use base64::{engine::general_purpose, Engine};
use rand::rngs::OsRng;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of each signaling key in bytes
pub const SIGNALING_KEY_LENGTH: usize = 32;

/// Decryption and verification keys for push notifications
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingKeys {
    /// Symmetric key used to decrypt push payloads
    #[serde(with = "serde_bytes")]
    pub decryption_key: Vec<u8>,
    /// MAC key used to verify push payloads
    #[serde(with = "serde_bytes")]
    pub verification_key: Vec<u8>,
}

/// Wire form: `{ "enckey": <base64>, "mackey": <base64> }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingKeysPayload {
    /// Base64 encoded decryption key
    pub enckey: String,
    /// Base64 encoded verification key
    pub mackey: String,
}

impl SignalingKeys {
    /// Wrap existing key bytes
    pub fn new(decryption_key: Vec<u8>, verification_key: Vec<u8>) -> Self {
        Self {
            decryption_key,
            verification_key,
        }
    }

    /// Generate a fresh random pair
    pub fn generate() -> Self {
        let mut decryption_key = vec![0u8; SIGNALING_KEY_LENGTH];
        let mut verification_key = vec![0u8; SIGNALING_KEY_LENGTH];
        OsRng.fill_bytes(&mut decryption_key);
        OsRng.fill_bytes(&mut verification_key);
        Self::new(decryption_key, verification_key)
    }

    /// Convert to the backend wire form
    pub fn to_payload(&self) -> SignalingKeysPayload {
        SignalingKeysPayload {
            enckey: general_purpose::STANDARD.encode(&self.decryption_key),
            mackey: general_purpose::STANDARD.encode(&self.verification_key),
        }
    }
}

// Key bytes stay out of logs.
impl fmt::Debug for SignalingKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingKeys")
            .field("decryption_key", &format_args!("<{} bytes>", self.decryption_key.len()))
            .field(
                "verification_key",
                &format_args!("<{} bytes>", self.verification_key.len()),
            )
            .finish()
    }
}
