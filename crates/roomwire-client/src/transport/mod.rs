//! Transport seam between the lifecycle manager and the socket.
//!
//! The manager only ever sees text frames through these two traits, so
//! integration tests can script a mock transport and the production path can
//! use `tokio-tungstenite` (see [`ws`]). A transport that hits a fatal error
//! is expected to log it and yield `None` from the next `recv` call; the
//! close, not the error, is what drives reconnection.

pub mod ws;

use async_trait::async_trait;

use roomwire_core::error::Result;

pub use ws::{WsConnector, WsTransport};

/// One live socket. Owned exclusively by the session run loop.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next inbound text frame. `None` means the peer closed the socket.
    async fn recv(&mut self) -> Option<Result<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Dials new sockets; the lifecycle manager keeps one of these so it can
/// redial during reconnection.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport>;
}
