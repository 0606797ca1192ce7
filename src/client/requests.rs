//! Requests that register a device and keep its key material current.
//!
//! Every builder here is pure: it reads the [`DeviceRecord`], asks the
//! [`KeyMaterialProvider`] for keys and returns an [`OutboundRequest`]. Key
//! state only changes later, when the caller completes the request with a
//! successful [`crate::transport::Outcome`].
//!
//! Registration and replenishment for the same device must not overlap:
//! both read the watermark now and advance it on completion.

use crate::client::{DeletionCredentials, DeviceClass, DeviceRecord, DeviceType, LoginCredentials};
use crate::crypto::{
    next_watermark, KeyBundle, KeyMaterialProvider, PrekeyPayload, PrekeyRecord,
    SignalingKeysPayload, DEFAULT_PREKEY_COUNT,
};
use crate::transport::{ClientField, CompletionEffect, Method, OutboundRequest};
use crate::utils::{ClientRequestError, KeysConfig, Result};
use log::warn;
use serde::Serialize;

/// Path of the client collection
pub const CLIENTS_PATH: &str = "/clients";

#[derive(Serialize)]
struct RegistrationPayload<'a> {
    #[serde(rename = "type")]
    device_type: DeviceType,
    label: &'a str,
    model: &'a str,
    #[serde(rename = "class")]
    device_class: DeviceClass,
    lastkey: PrekeyPayload,
    prekeys: Vec<PrekeyPayload>,
    sigkeys: SignalingKeysPayload,
    cookie: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct PrekeysUpdatePayload {
    prekeys: Vec<PrekeyPayload>,
}

#[derive(Serialize)]
struct SignalingKeysUpdatePayload {
    sigkeys: SignalingKeysPayload,
    // The backend rejects updates without this field, even when empty.
    prekeys: Vec<PrekeyPayload>,
}

/// Builds the client registration and key maintenance requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRequestFactory {
    key_count: u16,
}

impl Default for ClientRequestFactory {
    fn default() -> Self {
        Self::new(DEFAULT_PREKEY_COUNT)
    }
}

impl ClientRequestFactory {
    /// Factory generating `key_count` prekeys per request
    pub fn new(key_count: u16) -> Self {
        Self { key_count }
    }

    /// Factory configured from the `[keys]` section
    pub fn from_config(config: &KeysConfig) -> Self {
        Self::new(config.prekey_count)
    }

    /// Prekeys generated per request
    pub fn key_count(&self) -> u16 {
        self.key_count
    }

    /// Generate the full key bundle for a first registration.
    ///
    /// Prekey ids start at 0. Fails with `NoPreKeys` or `NoLastPreKey`
    /// when the provider cannot deliver; nothing is retried.
    pub fn generate_key_bundle<P>(&self, provider: &mut P) -> Result<KeyBundle>
    where
        P: KeyMaterialProvider + ?Sized,
    {
        let prekeys = self.generate_prekeys(provider, 0)?;
        let signaling_keys = provider.generate_signaling_keys();
        let last_prekey = provider.last_prekey().map_err(|err| {
            warn!("last-resort prekey unavailable: {err}");
            ClientRequestError::NoLastPreKey
        })?;

        Ok(KeyBundle {
            prekeys,
            last_prekey: PrekeyRecord::last_resort(last_prekey.public_key),
            signaling_keys,
        })
    }

    /// `POST /clients` registering `device` with a fresh key bundle.
    ///
    /// On success the request advances the prekey watermark past the
    /// uploaded ids and stores the new signaling keys.
    pub fn register_client_request<P>(
        &self,
        provider: &mut P,
        device: &DeviceRecord,
        credentials: Option<&LoginCredentials>,
        cookie_label: Option<&str>,
    ) -> Result<OutboundRequest>
    where
        P: KeyMaterialProvider + ?Sized,
    {
        let bundle = self.generate_key_bundle(provider)?;
        let watermark = bundle.next_watermark().ok_or(ClientRequestError::NoPreKeys)?;

        let payload = RegistrationPayload {
            device_type: device.device_type,
            label: device.label.as_deref().unwrap_or_default(),
            model: device.model.as_deref().unwrap_or_default(),
            device_class: device.device_class,
            lastkey: bundle.last_prekey.to_payload(),
            prekeys: bundle.prekeys.iter().map(PrekeyRecord::to_payload).collect(),
            sigkeys: bundle.signaling_keys.to_payload(),
            cookie: cookie_label.unwrap_or_default(),
            password: credentials.and_then(|c| c.password.as_deref()),
        };

        Ok(
            OutboundRequest::json(CLIENTS_PATH, Method::Post, serde_json::to_value(payload)?)
                .with_effect(CompletionEffect::AdvancePrekeyWatermark { watermark })
                .with_effect(CompletionEffect::StoreSignalingKeys {
                    keys: bundle.signaling_keys,
                }),
        )
    }

    /// `PUT /clients/{id}` uploading more prekeys, starting at the watermark
    pub fn update_prekeys_request<P>(
        &self,
        provider: &mut P,
        device: &DeviceRecord,
    ) -> Result<OutboundRequest>
    where
        P: KeyMaterialProvider + ?Sized,
    {
        let path = client_path(device)?;
        let prekeys = self.generate_prekeys(provider, device.key_state.prekey_watermark)?;
        let watermark = next_watermark(&prekeys).ok_or(ClientRequestError::NoPreKeys)?;

        let payload = PrekeysUpdatePayload {
            prekeys: prekeys.iter().map(PrekeyRecord::to_payload).collect(),
        };

        Ok(
            OutboundRequest::json(path, Method::Put, serde_json::to_value(payload)?)
                .with_updated_field(ClientField::NumberOfKeysRemaining)
                .with_effect(CompletionEffect::AdvancePrekeyWatermark { watermark }),
        )
    }

    /// `PUT /clients/{id}` replacing the signaling keys
    pub fn update_signaling_keys_request<P>(
        &self,
        provider: &mut P,
        device: &DeviceRecord,
    ) -> Result<OutboundRequest>
    where
        P: KeyMaterialProvider + ?Sized,
    {
        let path = client_path(device)?;
        let keys = provider.generate_signaling_keys();

        let payload = SignalingKeysUpdatePayload {
            sigkeys: keys.to_payload(),
            prekeys: Vec::new(),
        };

        Ok(
            OutboundRequest::json(path, Method::Put, serde_json::to_value(payload)?)
                .with_updated_field(ClientField::NeedsToUpdateSignalingKeys)
                .with_effect(CompletionEffect::StoreSignalingKeys { keys }),
        )
    }

    /// `DELETE /clients/{id}` authenticated with email and password
    pub fn delete_client_request(
        &self,
        device: &DeviceRecord,
        credentials: &DeletionCredentials,
    ) -> Result<OutboundRequest> {
        let path = client_path(device)?;
        Ok(
            OutboundRequest::json(path, Method::Delete, serde_json::to_value(credentials)?)
                .with_updated_field(ClientField::MarkedToDelete),
        )
    }

    /// `GET /clients`
    pub fn fetch_clients_request(&self) -> OutboundRequest {
        OutboundRequest::get(CLIENTS_PATH)
    }

    fn generate_prekeys<P>(&self, provider: &mut P, start: u16) -> Result<Vec<PrekeyRecord>>
    where
        P: KeyMaterialProvider + ?Sized,
    {
        let prekeys = provider.generate_prekeys(self.key_count, start).map_err(|err| {
            warn!("prekey generation from {start} failed: {err}");
            ClientRequestError::NoPreKeys
        })?;

        if prekeys.is_empty() {
            warn!("prekey generation from {start} returned no keys");
            return Err(ClientRequestError::NoPreKeys.into());
        }

        if prekeys.len() > usize::from(self.key_count) {
            warn!("provider returned {} prekeys, {} requested", prekeys.len(), self.key_count);
            return Err(ClientRequestError::NoPreKeys.into());
        }

        // Ids must run contiguously from the watermark and stay clear of the
        // reserved id.
        let misplaced = prekeys
            .iter()
            .zip(u32::from(start)..)
            .find(|(prekey, expected)| {
                u32::from(prekey.id) != *expected || prekey.is_last_resort()
            });
        if let Some((prekey, expected)) = misplaced {
            warn!("provider issued prekey id {} where {expected} was due", prekey.id);
            return Err(ClientRequestError::NoPreKeys.into());
        }

        Ok(prekeys)
    }
}

fn client_path(device: &DeviceRecord) -> Result<String> {
    let id = device
        .remote_identifier
        .as_deref()
        .ok_or(ClientRequestError::ClientNotRegistered)?;
    Ok(format!("{CLIENTS_PATH}/{id}"))
}
