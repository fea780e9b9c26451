//! Chat-room channel: messages, reactions, typing, presence list,
//! whiteboard strokes, and scheduled meetups.
//!
//! Types are symmetric (`chat`, `reaction`, `typing`, `whiteboard` flow both
//! ways); `users` and `meetups` are server-to-client, `meetup` requests are
//! client-to-server.

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};
use crate::protocol::envelope::Envelope;
use crate::protocol::{payload, ChannelProtocol, EventKind};

/// Wire `type` strings for the chat channel.
pub mod kind {
    pub const CHAT: &str = "chat";
    pub const REACTION: &str = "reaction";
    pub const TYPING: &str = "typing";
    pub const USERS: &str = "users";
    pub const WHITEBOARD: &str = "whiteboard";
    pub const MEETUP: &str = "meetup";
    pub const MEETUPS: &str = "meetups";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub user: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typing {
    pub user: String,
    pub active: bool,
}

/// Current room roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Users {
    pub users: Vec<String>,
}

/// Whiteboard action. `x`/`y` are normalized to [0,1] so clients of any
/// canvas size can replay strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WhiteboardAction {
    Draw {
        x: f64,
        y: f64,
        color: String,
        size: f64,
    },
    Clear,
}

/// Client-to-server meetup request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MeetupRequest {
    Create { title: String, time: String },
    List,
    Join { id: String },
    Leave { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meetup {
    pub id: String,
    pub title: String,
    pub time: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meetups {
    pub meetups: Vec<Meetup>,
}

/// Typed inbound event for the chat channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chat(Chat),
    Reaction(Reaction),
    Typing(Typing),
    Users(Users),
    Whiteboard(WhiteboardAction),
    Meetups(Meetups),
}

impl EventKind for ChatEvent {
    fn kind(&self) -> &'static str {
        match self {
            ChatEvent::Chat(_) => kind::CHAT,
            ChatEvent::Reaction(_) => kind::REACTION,
            ChatEvent::Typing(_) => kind::TYPING,
            ChatEvent::Users(_) => kind::USERS,
            ChatEvent::Whiteboard(_) => kind::WHITEBOARD,
            ChatEvent::Meetups(_) => kind::MEETUPS,
        }
    }
}

/// Marker type implementing the chat-channel decode.
pub struct ChatProtocol;

impl ChannelProtocol for ChatProtocol {
    type Event = ChatEvent;

    const KINDS: &'static [&'static str] = &[
        kind::CHAT,
        kind::REACTION,
        kind::TYPING,
        kind::USERS,
        kind::WHITEBOARD,
        kind::MEETUPS,
    ];

    fn decode(env: &Envelope) -> Result<ChatEvent> {
        match env.kind.as_str() {
            kind::CHAT => Ok(ChatEvent::Chat(payload(env)?)),
            kind::REACTION => Ok(ChatEvent::Reaction(payload(env)?)),
            kind::TYPING => Ok(ChatEvent::Typing(payload(env)?)),
            kind::USERS => Ok(ChatEvent::Users(payload(env)?)),
            kind::WHITEBOARD => Ok(ChatEvent::Whiteboard(payload(env)?)),
            kind::MEETUPS => Ok(ChatEvent::Meetups(payload(env)?)),
            other => Err(ChannelError::UnknownMessageType(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn whiteboard_draw_roundtrip_keeps_all_fields() {
        let action = WhiteboardAction::Draw {
            x: 0.5,
            y: 0.5,
            color: "#ff0000".to_owned(),
            size: 3.0,
        };
        let frame = Envelope::encode(kind::WHITEBOARD, &action).unwrap();
        let env = Envelope::parse(&frame).unwrap();
        match ChatProtocol::decode(&env).unwrap() {
            ChatEvent::Whiteboard(back) => assert_eq!(back, action),
            other => panic!("expected Whiteboard, got {other:?}"),
        }
    }

    #[test]
    fn whiteboard_clear_has_bare_action() {
        let env =
            Envelope::parse(r#"{"type":"whiteboard","data":{"action":"clear"}}"#).unwrap();
        assert_eq!(
            ChatProtocol::decode(&env).unwrap(),
            ChatEvent::Whiteboard(WhiteboardAction::Clear)
        );
    }

    #[test]
    fn meetups_list_decodes() {
        let env = Envelope::parse(
            r#"{"type":"meetups","data":{"meetups":[{"id":"m1","title":"standup","time":"2026-09-01T10:00:00Z","attendees":["ana","bo"]}]}}"#,
        )
        .unwrap();
        match ChatProtocol::decode(&env).unwrap() {
            ChatEvent::Meetups(m) => {
                assert_eq!(m.meetups.len(), 1);
                assert_eq!(m.meetups[0].attendees, vec!["ana", "bo"]);
            }
            other => panic!("expected Meetups, got {other:?}"),
        }
    }

    #[test]
    fn typing_payload_with_wrong_shape_is_malformed() {
        let env = Envelope::parse(r#"{"type":"typing","data":{"user":42}}"#).unwrap();
        let err = ChatProtocol::decode(&env).unwrap_err();
        assert_eq!(err.kind(), "MALFORMED_MESSAGE");
    }
}
