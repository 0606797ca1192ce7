//! Transport-facing request descriptions.
//!
//! Nothing in this module performs I/O. Factories produce
//! [`OutboundRequest`]s; an external transport executes them and hands the
//! [`Outcome`] back to [`OutboundRequest::complete`], which applies the
//! attached [`CompletionEffect`]s.

pub mod effects;
pub mod request;

pub use effects::*;
pub use request::*;
