//! Avatar-room channel: presence, movement, chat, and agent traffic.
//!
//! Inbound types: `chat_message`, `user_joined`, `user_left`, `user_moved`,
//! `agent_message` (`pong` is handled centrally by the dispatcher).
//! Outbound types: `join_room`, `rejoin_room`, `leave_room`, `chat_message`,
//! `user_movement`, `agent_chat`, `camera_frame`, `ping`.

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};
use crate::protocol::envelope::Envelope;
use crate::protocol::{payload, ChannelProtocol, EventKind};

/// Wire `type` strings for the room channel.
pub mod kind {
    pub const JOIN_ROOM: &str = "join_room";
    pub const REJOIN_ROOM: &str = "rejoin_room";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const USER_MOVEMENT: &str = "user_movement";
    pub const AGENT_CHAT: &str = "agent_chat";
    pub const CAMERA_FRAME: &str = "camera_frame";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const USER_MOVED: &str = "user_moved";
    pub const AGENT_MESSAGE: &str = "agent_message";
}

/// Position or rotation vector. On the wire this is a numeric triple
/// `[x, y, z]`; handlers always receive the reconstructed struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Who is joining: carried in `join_room` and echoed in `user_joined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoom {
    pub room: String,
    pub user: UserDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejoinRoom {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRoom {
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub text: String,
}

/// Movement payload, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub position: Vec3,
    pub rotation: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJoined {
    pub user: UserDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLeft {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChat {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub text: String,
}

/// Captured camera frame, opaque to the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraFrame {
    pub frame: String,
}

/// Typed inbound event for the room channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ChatMessage(ChatMessage),
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    UserMoved(Movement),
    AgentMessage(AgentMessage),
}

impl EventKind for RoomEvent {
    fn kind(&self) -> &'static str {
        match self {
            RoomEvent::ChatMessage(_) => kind::CHAT_MESSAGE,
            RoomEvent::UserJoined(_) => kind::USER_JOINED,
            RoomEvent::UserLeft(_) => kind::USER_LEFT,
            RoomEvent::UserMoved(_) => kind::USER_MOVED,
            RoomEvent::AgentMessage(_) => kind::AGENT_MESSAGE,
        }
    }
}

/// Marker type implementing the room-channel decode.
pub struct RoomProtocol;

impl ChannelProtocol for RoomProtocol {
    type Event = RoomEvent;

    const KINDS: &'static [&'static str] = &[
        kind::CHAT_MESSAGE,
        kind::USER_JOINED,
        kind::USER_LEFT,
        kind::USER_MOVED,
        kind::AGENT_MESSAGE,
    ];

    fn decode(env: &Envelope) -> Result<RoomEvent> {
        match env.kind.as_str() {
            kind::CHAT_MESSAGE => Ok(RoomEvent::ChatMessage(payload(env)?)),
            kind::USER_JOINED => Ok(RoomEvent::UserJoined(payload(env)?)),
            kind::USER_LEFT => Ok(RoomEvent::UserLeft(payload(env)?)),
            kind::USER_MOVED => Ok(RoomEvent::UserMoved(payload(env)?)),
            kind::AGENT_MESSAGE => Ok(RoomEvent::AgentMessage(payload(env)?)),
            other => Err(ChannelError::UnknownMessageType(other.to_owned())),
        }
    }
}
