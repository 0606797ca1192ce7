//! Key material for client registration.
//!
//! This module defines the prekey and signaling key records that end up in
//! registration payloads, the [`KeyMaterialProvider`] capability the request
//! factories consume, and a software implementation of that capability.

pub mod keystore;
pub mod prekeys;
pub mod signaling;

pub use keystore::*;
pub use prekeys::*;
pub use signaling::*;
