//! Error types for request construction, key generation and configuration.
//!
//! Every error in this module is local and synchronous: it means a request
//! could not be built at all. Transport failures never show up here, they
//! are reported back through [`crate::transport::Outcome`].

use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, OtrError>;

/// Top-level error for all library operations
#[derive(Error, Debug, Clone)]
pub enum OtrError {
    /// A client request could not be constructed
    #[error("Request error: {0}")]
    Request(#[from] ClientRequestError),

    /// Key material could not be produced
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Base64 decoding errors
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Failures of the client registration request factory
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequestError {
    /// Prekey generation returned no usable keys
    #[error("no prekeys could be generated")]
    NoPreKeys,

    /// The reserved last-resort prekey could not be produced
    #[error("last-resort prekey is unavailable")]
    NoLastPreKey,

    /// The device has no backend-assigned identifier yet
    #[error("client is not registered with the backend")]
    ClientNotRegistered,
}

/// Key material errors raised by a [`crate::crypto::KeyMaterialProvider`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key generation failure
    #[error("Key generation failed: {reason}")]
    KeyGeneration {
        /// What the key source reported
        reason: String,
    },

    /// Invalid key format or size
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Random number generation failure
    #[error("RNG error: {reason}")]
    Rng {
        /// Underlying RNG failure
        reason: String,
    },
}

/// Configuration and setup errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Missing required configuration
    #[error("Missing configuration: {field}")]
    MissingField {
        /// Dotted name of the missing key
        field: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue {
        /// Dotted name of the offending key
        field: String,
        /// Value as given
        value: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Configuration parsing error
    #[error("Configuration parse error: {reason}")]
    ParseError {
        /// Parser message
        reason: String,
    },

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl OtrError {
    /// Returns true if retrying the same call could succeed without any
    /// change of state on the caller's side.
    ///
    /// Construction failures never are: the caller has to come back with
    /// fresh state (a registered client, a working key store).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// The request factory failure behind this error, if it is one
    pub fn request_error(&self) -> Option<ClientRequestError> {
        match self {
            Self::Request(err) => Some(*err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OtrError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OtrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
