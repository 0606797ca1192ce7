//! Device metadata, key bookkeeping and credentials.

use crate::crypto::SignalingKeys;
use crate::utils::{ConfigError, OtrError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How long the backend should keep the registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Kept until explicitly deleted
    #[default]
    Permanent,
    /// Dropped when the session ends
    Temporary,
    /// Legal hold device
    LegalHold,
}

/// Hardware class reported at registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Phone
    Phone,
    /// Tablet
    Tablet,
    /// Desktop or laptop
    #[default]
    Desktop,
    /// Legal hold device
    LegalHold,
}

impl DeviceType {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Temporary => "temporary",
            Self::LegalHold => "legalhold",
        }
    }
}

impl DeviceClass {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::LegalHold => "legalhold",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = OtrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "permanent" => Ok(Self::Permanent),
            "temporary" => Ok(Self::Temporary),
            "legalhold" => Ok(Self::LegalHold),
            other => Err(ConfigError::InvalidValue {
                field: "device_type".to_string(),
                value: other.to_string(),
            }
            .into()),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = OtrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "phone" => Ok(Self::Phone),
            "tablet" => Ok(Self::Tablet),
            "desktop" => Ok(Self::Desktop),
            "legalhold" => Ok(Self::LegalHold),
            other => Err(ConfigError::InvalidValue {
                field: "class".to_string(),
                value: other.to_string(),
            }
            .into()),
        }
    }
}

/// Key bookkeeping for one device.
///
/// Only completion effects change this, and only after the backend has
/// confirmed the matching request. `prekey_watermark` never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKeyState {
    /// Next unused prekey id: one past the highest id the backend accepted
    pub prekey_watermark: u16,
    /// Signaling keys the backend currently holds for this device
    pub signaling_keys: Option<SignalingKeys>,
    /// Set when the signaling keys have to be uploaded again
    pub needs_signaling_key_rotation: bool,
}

/// This device as registered (or about to be registered) with the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Backend-assigned client id, absent until registration succeeds
    pub remote_identifier: Option<String>,
    /// Registration lifetime
    pub device_type: DeviceType,
    /// Human readable label
    pub label: Option<String>,
    /// Hardware model
    pub model: Option<String>,
    /// Hardware class
    pub device_class: DeviceClass,
    /// Key bookkeeping
    pub key_state: ClientKeyState,
}

impl DeviceRecord {
    /// Create an unregistered device
    pub fn new(device_type: DeviceType, device_class: DeviceClass) -> Self {
        Self {
            device_type,
            device_class,
            ..Self::default()
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the backend-assigned client id
    pub fn with_remote_identifier(mut self, id: impl Into<String>) -> Self {
        self.remote_identifier = Some(id.into());
        self
    }

    /// Whether the backend has assigned this device an id
    pub fn is_registered(&self) -> bool {
        self.remote_identifier.is_some()
    }

    /// Load a device record from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the device record as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Credentials the user logged in with. Either half may be missing, for
/// example after a phone-number login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Account email
    pub email: Option<String>,
    /// Account password
    pub password: Option<String>,
}

/// Credentials required to delete a client. Both fields are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionCredentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl LoginCredentials {
    /// Email and password credentials
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    /// Credentials usable for client deletion, if both halves are present
    pub fn for_deletion(&self) -> Option<DeletionCredentials> {
        Some(DeletionCredentials {
            email: self.email.clone()?,
            password: self.password.clone()?,
        })
    }
}
