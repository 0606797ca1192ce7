//! Software key store backed by X25519 key pairs.
//!
//! Keeps the private halves of every prekey it hands out so a session can
//! later be opened against them. The last-resort key is created once and
//! returned unchanged for the lifetime of the store.

use crate::crypto::{KeyMaterialProvider, PrekeyRecord, SignalingKeys, MAX_PREKEY_ID};
use crate::utils::{CryptoError, Result};
use log::debug;
use rand::rngs::OsRng;
use std::collections::HashMap;
use x25519_dalek::{PublicKey, StaticSecret};

/// In-memory [`KeyMaterialProvider`]
#[derive(Default)]
pub struct SoftwareKeyStore {
    /// Private keys of issued one-time prekeys
    prekey_secrets: HashMap<u16, StaticSecret>,
    /// Private key of the last-resort prekey
    last_resort_secret: Option<StaticSecret>,
}

impl SoftwareKeyStore {
    /// Create an empty key store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of one-time prekey secrets currently held
    pub fn prekey_count(&self) -> usize {
        self.prekey_secrets.len()
    }

    /// Remove and return the private key of a one-time prekey
    pub fn take_prekey_secret(&mut self, id: u16) -> Option<StaticSecret> {
        self.prekey_secrets.remove(&id)
    }
}

impl KeyMaterialProvider for SoftwareKeyStore {
    fn generate_prekeys(&mut self, count: u16, start: u16) -> Result<Vec<PrekeyRecord>> {
        if start > MAX_PREKEY_ID {
            return Err(CryptoError::KeyGeneration {
                reason: format!("prekey id space exhausted at {start}"),
            }
            .into());
        }

        // Truncate the batch rather than spill into the reserved id.
        let available = MAX_PREKEY_ID - start + 1;
        let count = count.min(available);
        let mut prekeys = Vec::with_capacity(usize::from(count));

        for id in (start..=MAX_PREKEY_ID).take(usize::from(count)) {
            let secret = StaticSecret::random_from_rng(OsRng);
            let public = PublicKey::from(&secret);
            self.prekey_secrets.insert(id, secret);
            prekeys.push(PrekeyRecord::new(id, public.to_bytes().to_vec()));
        }

        debug!("generated {} prekeys starting at {}", prekeys.len(), start);
        Ok(prekeys)
    }

    fn last_prekey(&mut self) -> Result<PrekeyRecord> {
        let secret = self
            .last_resort_secret
            .get_or_insert_with(|| StaticSecret::random_from_rng(OsRng));
        let public = PublicKey::from(&*secret);
        Ok(PrekeyRecord::last_resort(public.to_bytes().to_vec()))
    }

    fn generate_signaling_keys(&mut self) -> SignalingKeys {
        SignalingKeys::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LAST_PREKEY_ID;

    #[test]
    fn test_generates_contiguous_ids() {
        let mut store = SoftwareKeyStore::new();
        let prekeys = store.generate_prekeys(5, 40).unwrap();

        let ids: Vec<u16> = prekeys.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![40, 41, 42, 43, 44]);
        assert!(prekeys.iter().all(|p| p.public_key.len() == 32));
        assert_eq!(store.prekey_count(), 5);
    }

    #[test]
    fn test_private_key_matches_public_key() {
        let mut store = SoftwareKeyStore::new();
        let prekey = store.generate_prekeys(1, 0).unwrap().remove(0);

        let secret = store.take_prekey_secret(prekey.id).unwrap();
        assert_eq!(PublicKey::from(&secret).to_bytes().to_vec(), prekey.public_key);
        assert!(store.take_prekey_secret(prekey.id).is_none());
    }

    #[test]
    fn test_batch_stops_before_reserved_id() {
        let mut store = SoftwareKeyStore::new();
        let prekeys = store.generate_prekeys(10, MAX_PREKEY_ID - 2).unwrap();

        let ids: Vec<u16> = prekeys.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![MAX_PREKEY_ID - 2, MAX_PREKEY_ID - 1, MAX_PREKEY_ID]);
        assert!(store.generate_prekeys(1, LAST_PREKEY_ID).is_err());
    }

    #[test]
    fn test_last_resort_key_is_stable() {
        let mut store = SoftwareKeyStore::new();
        let first = store.last_prekey().unwrap();
        let second = store.last_prekey().unwrap();

        assert_eq!(first.id, LAST_PREKEY_ID);
        assert_eq!(first, second);
    }
}
