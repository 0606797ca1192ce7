//! Prekey records and the key material capability.
//!
//! Prekeys let a peer open an encrypted session with this device while it is
//! offline. Each one-time prekey carries a 16-bit id that is unique per
//! device. The top of the id space is reserved for the last-resort key,
//! which is never consumed and is only used once all one-time keys are gone.

use crate::crypto::SignalingKeys;
use crate::utils::Result;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

/// Number of one-time prekeys to generate by default
pub const DEFAULT_PREKEY_COUNT: u16 = 100;

/// Id reserved for the last-resort prekey
pub const LAST_PREKEY_ID: u16 = u16::MAX;

/// Highest id a regular one-time prekey may carry
pub const MAX_PREKEY_ID: u16 = LAST_PREKEY_ID - 1;

/// A public prekey as uploaded to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrekeyRecord {
    /// Prekey id, unique per device
    pub id: u16,
    /// Serialized public key
    pub public_key: Vec<u8>,
}

/// Wire form of a prekey: `{ "key": <base64>, "id": <u16> }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrekeyPayload {
    /// Base64 encoded public key
    pub key: String,
    /// Prekey id
    pub id: u16,
}

impl PrekeyRecord {
    /// Create a regular prekey record
    pub fn new(id: u16, public_key: Vec<u8>) -> Self {
        Self { id, public_key }
    }

    /// Create the last-resort record; the id is always [`LAST_PREKEY_ID`]
    pub fn last_resort(public_key: Vec<u8>) -> Self {
        Self {
            id: LAST_PREKEY_ID,
            public_key,
        }
    }

    /// Whether this record uses the reserved last-resort id
    pub fn is_last_resort(&self) -> bool {
        self.id == LAST_PREKEY_ID
    }

    /// Convert to the backend wire form
    pub fn to_payload(&self) -> PrekeyPayload {
        PrekeyPayload {
            key: general_purpose::STANDARD.encode(&self.public_key),
            id: self.id,
        }
    }
}

impl TryFrom<&PrekeyPayload> for PrekeyRecord {
    type Error = crate::utils::OtrError;

    fn try_from(payload: &PrekeyPayload) -> Result<Self> {
        let public_key = general_purpose::STANDARD.decode(&payload.key)?;
        Ok(Self::new(payload.id, public_key))
    }
}

/// Everything uploaded when a device registers for the first time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBundle {
    /// One-time prekeys, in id order
    pub prekeys: Vec<PrekeyRecord>,
    /// Reserved last-resort prekey
    pub last_prekey: PrekeyRecord,
    /// Push notification signaling keys
    pub signaling_keys: SignalingKeys,
}

impl KeyBundle {
    /// The watermark the device moves to once the backend accepts these
    /// prekeys: one past the highest id in the bundle.
    pub fn next_watermark(&self) -> Option<u16> {
        next_watermark(&self.prekeys)
    }
}

/// One past the highest regular prekey id in `prekeys`.
///
/// Returns `None` for an empty batch. Regular ids never exceed
/// [`MAX_PREKEY_ID`], so the result always fits a `u16`.
pub fn next_watermark(prekeys: &[PrekeyRecord]) -> Option<u16> {
    prekeys
        .iter()
        .map(|prekey| prekey.id)
        .filter(|&id| id <= MAX_PREKEY_ID)
        .max()
        .map(|id| id + 1)
}

/// Produces key material for registration and replenishment requests.
///
/// Generation can be slow (one asymmetric key pair per prekey) and is never
/// retried by the callers; a failure aborts the request being built.
pub trait KeyMaterialProvider {
    /// Generate up to `count` new prekeys with ids starting at `start`.
    ///
    /// Ids are contiguous and never reach [`LAST_PREKEY_ID`].
    fn generate_prekeys(&mut self, count: u16, start: u16) -> Result<Vec<PrekeyRecord>>;

    /// The reserved last-resort prekey
    fn last_prekey(&mut self) -> Result<PrekeyRecord>;

    /// A fresh pair of signaling keys
    fn generate_signaling_keys(&mut self) -> SignalingKeys;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_id_layout() {
        assert_eq!(LAST_PREKEY_ID, 65535);
        assert_eq!(MAX_PREKEY_ID, 65534);
        assert!(PrekeyRecord::last_resort(vec![1]).is_last_resort());
        assert!(!PrekeyRecord::new(MAX_PREKEY_ID, vec![1]).is_last_resort());
    }

    #[test]
    fn test_payload_shape() {
        let record = PrekeyRecord::new(7, vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(record.to_payload()).unwrap();

        assert_eq!(json, serde_json::json!({ "key": "3q2+7w==", "id": 7 }));
        assert_eq!(
            PrekeyRecord::try_from(&record.to_payload()).unwrap(),
            record
        );
    }

    #[test]
    fn test_next_watermark() {
        assert_eq!(next_watermark(&[]), None);

        let batch: Vec<_> = (10..13).map(|id| PrekeyRecord::new(id, vec![])).collect();
        assert_eq!(next_watermark(&batch), Some(13));

        let top = [PrekeyRecord::new(MAX_PREKEY_ID, vec![])];
        assert_eq!(next_watermark(&top), Some(LAST_PREKEY_ID));

        let reserved_only = [PrekeyRecord::last_resort(vec![])];
        assert_eq!(next_watermark(&reserved_only), None);
    }
}
