//! roomwire core: transport-agnostic protocol primitives, error types, and
//! reconnect policy math.
//!
//! This crate defines the wire-level contracts and error surface shared by the
//! client and test tooling. It intentionally carries no transport or runtime
//! dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ChannelError`/`Result` so a single bad
//! frame can never crash a consumer.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod retry;

/// Shared result type.
pub use error::{ChannelError, Result};
pub use retry::ReconnectPolicy;
