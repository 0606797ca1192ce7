//! Device records and the client registration request factory.
//!
//! A [`DeviceRecord`] is this installation as the backend knows it. Its
//! [`ClientKeyState`] is the only long-lived key bookkeeping in the crate,
//! and [`ClientRequestFactory`] reads it to build register, replenish,
//! rotate and delete requests.

pub mod device;
pub mod requests;

pub use device::*;
pub use requests::*;
