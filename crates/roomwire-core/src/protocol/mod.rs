//! Protocol modules for the two realtime channels.
//!
//! Both channels share one envelope shape (`{"type", "data", "timestamp"}`,
//! see [`envelope`]) and one decode seam ([`ChannelProtocol`]); they differ
//! only in the closed set of message types they recognize:
//! - [`room`]: avatar-room presence/movement/chat.
//! - [`chat`]: chat-room messages, reactions, whiteboard, meetups.
//!
//! All parsers are panic-free: malformed input is reported as `ChannelError`
//! instead of panicking, keeping consumers resilient to hostile traffic.

pub mod chat;
pub mod envelope;
pub mod room;

use serde::de::DeserializeOwned;

use crate::error::{ChannelError, Result};
use envelope::Envelope;

/// Heartbeat wire types. Shared by both channels and handled centrally by
/// the dispatcher, so neither protocol lists them.
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

/// Decode seam shared by both channels.
///
/// A protocol names its closed set of inbound wire types and turns an
/// [`Envelope`] into a typed event. Unrecognized types must surface as
/// [`ChannelError::UnknownMessageType`] so the dispatcher can log-and-drop
/// without ever tearing down the connection.
pub trait ChannelProtocol: Send + Sync + 'static {
    /// Typed inbound event for this channel.
    type Event: EventKind + Send + 'static;

    /// Closed set of inbound wire types this channel recognizes.
    const KINDS: &'static [&'static str];

    fn decode(env: &Envelope) -> Result<Self::Event>;
}

/// Maps a typed event back to its wire `type` discriminator.
pub trait EventKind {
    fn kind(&self) -> &'static str;
}

/// Decode an envelope's `data` payload into `T`.
///
/// Missing or mismatched payloads are `MalformedMessage`, never a panic.
pub(crate) fn payload<T: DeserializeOwned>(env: &Envelope) -> Result<T> {
    let raw = env
        .data
        .as_ref()
        .ok_or_else(|| ChannelError::MalformedMessage(format!("{}: missing data", env.kind)))?;
    serde_json::from_str(raw.get())
        .map_err(|e| ChannelError::MalformedMessage(format!("{}: {e}", env.kind)))
}
