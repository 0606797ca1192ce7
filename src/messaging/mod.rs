//! Encrypted message and asset upload requests.
//!
//! Encryption itself is provided by the message types through the
//! [`OtrMessage`] and [`AssetMessage`] traits; this module only decides
//! which endpoint to use and how to frame the payload.

pub mod assets;
pub mod factory;
pub mod strategy;

pub use assets::*;
pub use factory::*;
pub use strategy::*;
