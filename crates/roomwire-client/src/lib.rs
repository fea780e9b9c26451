//! roomwire client library entry.
//!
//! This crate wires the transport seam, dispatcher, and connection lifecycle
//! manager into a reconnecting realtime channel. It is intended to be
//! consumed by the binary (`main.rs`), by host applications embedding a
//! channel, and by integration tests.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod transport;

pub use channel::{Channel, ChannelSettings, ChatChannel, RoomChannel};
pub use dispatch::Dispatcher;
pub use transport::{Connector, Transport};
