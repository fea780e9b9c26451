//! Wire envelope (JSON).
//!
//! Every frame in both directions is `{"type": <string>, "data": <payload>,
//! "timestamp": <integer ms>}`. The timestamp is stamped by the sending
//! channel at send time, not by application callers. `data` is stored as
//! `RawValue` to enable lazy parsing by the per-channel decoders.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{ChannelError, Result};

/// Channel envelope (Text frame).
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
    /// Sender-assigned milliseconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Envelope {
    /// Parse a raw text frame. Invalid JSON or a missing `type` field is a
    /// `MalformedMessage`; the frame is expected to be dropped by the caller
    /// without affecting connection state.
    pub fn parse(raw: &str) -> Result<Envelope> {
        serde_json::from_str(raw).map_err(|e| ChannelError::MalformedMessage(e.to_string()))
    }

    /// Build and serialize an outbound frame, stamping the timestamp.
    pub fn encode<T: Serialize>(kind: &str, data: &T) -> Result<String> {
        let raw = serde_json::value::to_raw_value(data)
            .map_err(|e| ChannelError::Internal(format!("encode {kind}: {e}")))?;
        let env = Envelope {
            kind: kind.to_owned(),
            data: Some(raw),
            timestamp: Some(now_ms()),
        };
        serde_json::to_string(&env)
            .map_err(|e| ChannelError::Internal(format!("encode {kind}: {e}")))
    }

    /// Serialize a payload-less frame (e.g. `ping`), stamping the timestamp.
    pub fn encode_bare(kind: &str) -> Result<String> {
        let env = Envelope {
            kind: kind.to_owned(),
            data: None,
            timestamp: Some(now_ms()),
        };
        serde_json::to_string(&env)
            .map_err(|e| ChannelError::Internal(format!("encode {kind}: {e}")))
    }
}

/// Milliseconds since the Unix epoch. A pre-epoch clock yields 0.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
