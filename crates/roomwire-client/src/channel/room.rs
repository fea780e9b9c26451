//! Typed outbound API and registration helpers for the avatar-room channel.

use roomwire_core::error::Result;
use roomwire_core::protocol::room::{
    kind, AgentChat, AgentMessage, CameraFrame, ChatMessage, JoinRoom, LeaveRoom, Movement,
    RoomEvent, RoomProtocol, UserDescriptor, UserJoined, UserLeft, Vec3,
};

use super::{Channel, Membership};
use crate::transport::Connector;

/// The avatar-room channel: presence, movement, chat, agent traffic.
pub type RoomChannel<C> = Channel<RoomProtocol, C>;

impl<C: Connector> RoomChannel<C> {
    /// Join a room. The membership is remembered and replayed after every
    /// reconnect (`rejoin_room`); if called while disconnected, the full
    /// `join_room` is deferred to the next successful connect.
    pub fn join_room(&self, room: impl Into<String>, user: UserDescriptor) -> Result<()> {
        let room = room.into();
        let connected = self.is_connected();
        self.set_membership(Some(Membership {
            room: room.clone(),
            user: Some(user.clone()),
            announced: connected,
        }));
        if connected {
            self.send_now(kind::JOIN_ROOM, &JoinRoom { room, user })
        } else {
            tracing::debug!(room = %room, "not connected; join deferred until connect");
            Ok(())
        }
    }

    /// Leave the current room and clear the stored membership, so no rejoin
    /// is replayed on the next reconnect.
    pub fn leave_room(&self) -> Result<()> {
        match self.take_membership() {
            Some((room, _)) if self.is_connected() => {
                self.send_now(kind::LEAVE_ROOM, &LeaveRoom { room })
            }
            _ => Ok(()),
        }
    }

    pub fn send_message(&self, text: impl Into<String>) -> Result<()> {
        self.send_event(
            kind::CHAT_MESSAGE,
            &ChatMessage {
                from: None,
                text: text.into(),
            },
        )
    }

    pub fn send_movement(&self, position: Vec3, rotation: Vec3) -> Result<()> {
        self.send_event(
            kind::USER_MOVEMENT,
            &Movement {
                user_id: None,
                position,
                rotation,
            },
        )
    }

    /// Message directed at an automated agent in the room.
    pub fn send_agent_message(&self, text: impl Into<String>) -> Result<()> {
        self.send_event(kind::AGENT_CHAT, &AgentChat { text: text.into() })
    }

    /// Captured camera frame; the payload is opaque to the channel.
    pub fn send_camera_frame(&self, frame: impl Into<String>) -> Result<()> {
        self.send_event(
            kind::CAMERA_FRAME,
            &CameraFrame {
                frame: frame.into(),
            },
        )
    }

    pub fn on_chat(&self, f: impl Fn(&ChatMessage) + Send + Sync + 'static) {
        self.on(kind::CHAT_MESSAGE, move |ev| {
            if let RoomEvent::ChatMessage(m) = ev {
                f(m)
            }
        });
    }

    pub fn on_user_joined(&self, f: impl Fn(&UserJoined) + Send + Sync + 'static) {
        self.on(kind::USER_JOINED, move |ev| {
            if let RoomEvent::UserJoined(u) = ev {
                f(u)
            }
        });
    }

    pub fn on_user_left(&self, f: impl Fn(&UserLeft) + Send + Sync + 'static) {
        self.on(kind::USER_LEFT, move |ev| {
            if let RoomEvent::UserLeft(u) = ev {
                f(u)
            }
        });
    }

    pub fn on_user_moved(&self, f: impl Fn(&Movement) + Send + Sync + 'static) {
        self.on(kind::USER_MOVED, move |ev| {
            if let RoomEvent::UserMoved(m) = ev {
                f(m)
            }
        });
    }

    pub fn on_agent_message(&self, f: impl Fn(&AgentMessage) + Send + Sync + 'static) {
        self.on(kind::AGENT_MESSAGE, move |ev| {
            if let RoomEvent::AgentMessage(m) = ev {
                f(m)
            }
        });
    }
}
