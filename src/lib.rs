//! # OTR Client
//!
//! Client-side protocol layer that bootstraps a device's end-to-end
//! encryption identity with the backend and turns outgoing encrypted
//! messages into transport requests.
//!
//! ## Features
//!
//! - **Client registration**: device metadata plus a fresh key bundle
//!   (one-time prekeys, the reserved last-resort prekey, signaling keys)
//! - **Key maintenance**: prekey replenishment from a persistent watermark,
//!   signaling key rotation, client deletion
//! - **OTR messages**: encrypted message uploads with per-attempt
//!   missing-client strategies
//! - **Image assets**: inline/new uploads as multipart, metadata-only retries
//!
//! ## Quick Start
//!
//! ```rust
//! use otr_client::{
//!     ClientRequestFactory, DeviceClass, DeviceRecord, DeviceType, Outcome, SoftwareKeyStore,
//! };
//!
//! let factory = ClientRequestFactory::new(10);
//! let mut keys = SoftwareKeyStore::new();
//! let mut device = DeviceRecord::new(DeviceType::Permanent, DeviceClass::Desktop);
//!
//! let request = factory.register_client_request(&mut keys, &device, None, None)?;
//! // ... hand `request` to the transport, then report the outcome:
//! request.complete(&Outcome::success(201, None), &mut device.key_state);
//! assert_eq!(device.key_state.prekey_watermark, 10);
//! # Ok::<(), otr_client::OtrError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`crypto`]: prekey and signaling key records, the key provider trait
//! - [`client`]: device records and the registration request factory
//! - [`messaging`]: message and asset request factory
//! - [`transport`]: request descriptions, outcomes, completion effects
//! - [`utils`]: configuration and error handling
//!
//! No module performs I/O on behalf of a request; executing requests is the
//! caller's transport's job.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod crypto;
pub mod messaging;
pub mod transport;
pub mod utils;

// Re-export commonly used types for convenience
pub use client::{
    ClientKeyState, ClientRequestFactory, DeletionCredentials, DeviceClass, DeviceRecord,
    DeviceType, LoginCredentials,
};
pub use crypto::{KeyMaterialProvider, PrekeyRecord, SignalingKeys, SoftwareKeyStore};
pub use messaging::{
    AssetMessage, AssetUploadDecision, EncryptedPayload, ImageFormat, MessageRequestFactory,
    MissingClientStrategy, OtrMessage,
};
pub use transport::{CompletionEffect, Method, OutboundRequest, Outcome, ResponseStatus};
pub use utils::{ClientConfig, ClientRequestError, OtrError, Result};
