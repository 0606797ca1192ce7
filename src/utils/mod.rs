//! Configuration and error handling shared by all modules.

pub mod config;
pub mod errors;

pub use config::*;
pub use errors::*;
