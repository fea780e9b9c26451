//! Typed outbound API and registration helpers for the chat-room channel.

use roomwire_core::error::Result;
use roomwire_core::protocol::chat::{
    kind, Chat, ChatEvent, ChatProtocol, Meetups, MeetupRequest, Reaction, Typing, Users,
    WhiteboardAction,
};

use super::Channel;
use crate::transport::Connector;

/// The chat-room channel: messages, reactions, whiteboard, meetups.
pub type ChatChannel<C> = Channel<ChatProtocol, C>;

impl<C: Connector> ChatChannel<C> {
    pub fn send_chat(&self, user: impl Into<String>, text: impl Into<String>) -> Result<()> {
        self.send_event(
            kind::CHAT,
            &Chat {
                user: user.into(),
                text: text.into(),
            },
        )
    }

    pub fn send_reaction(&self, user: impl Into<String>, emoji: impl Into<String>) -> Result<()> {
        self.send_event(
            kind::REACTION,
            &Reaction {
                user: user.into(),
                emoji: emoji.into(),
            },
        )
    }

    pub fn send_typing(&self, user: impl Into<String>, active: bool) -> Result<()> {
        self.send_event(
            kind::TYPING,
            &Typing {
                user: user.into(),
                active,
            },
        )
    }

    /// Whiteboard stroke point. Coordinates are clamped into the normalized
    /// [0,1] canvas space the wire contract requires.
    pub fn send_draw(&self, x: f64, y: f64, color: impl Into<String>, size: f64) -> Result<()> {
        self.send_event(
            kind::WHITEBOARD,
            &WhiteboardAction::Draw {
                x: x.clamp(0.0, 1.0),
                y: y.clamp(0.0, 1.0),
                color: color.into(),
                size,
            },
        )
    }

    pub fn clear_whiteboard(&self) -> Result<()> {
        self.send_event(kind::WHITEBOARD, &WhiteboardAction::Clear)
    }

    pub fn create_meetup(&self, title: impl Into<String>, time: impl Into<String>) -> Result<()> {
        self.send_event(
            kind::MEETUP,
            &MeetupRequest::Create {
                title: title.into(),
                time: time.into(),
            },
        )
    }

    pub fn list_meetups(&self) -> Result<()> {
        self.send_event(kind::MEETUP, &MeetupRequest::List)
    }

    pub fn join_meetup(&self, id: impl Into<String>) -> Result<()> {
        self.send_event(kind::MEETUP, &MeetupRequest::Join { id: id.into() })
    }

    pub fn leave_meetup(&self, id: impl Into<String>) -> Result<()> {
        self.send_event(kind::MEETUP, &MeetupRequest::Leave { id: id.into() })
    }

    pub fn on_chat(&self, f: impl Fn(&Chat) + Send + Sync + 'static) {
        self.on(kind::CHAT, move |ev| {
            if let ChatEvent::Chat(c) = ev {
                f(c)
            }
        });
    }

    pub fn on_reaction(&self, f: impl Fn(&Reaction) + Send + Sync + 'static) {
        self.on(kind::REACTION, move |ev| {
            if let ChatEvent::Reaction(r) = ev {
                f(r)
            }
        });
    }

    pub fn on_typing(&self, f: impl Fn(&Typing) + Send + Sync + 'static) {
        self.on(kind::TYPING, move |ev| {
            if let ChatEvent::Typing(t) = ev {
                f(t)
            }
        });
    }

    pub fn on_users(&self, f: impl Fn(&Users) + Send + Sync + 'static) {
        self.on(kind::USERS, move |ev| {
            if let ChatEvent::Users(u) = ev {
                f(u)
            }
        });
    }

    pub fn on_whiteboard(&self, f: impl Fn(&WhiteboardAction) + Send + Sync + 'static) {
        self.on(kind::WHITEBOARD, move |ev| {
            if let ChatEvent::Whiteboard(w) = ev {
                f(w)
            }
        });
    }

    pub fn on_meetups(&self, f: impl Fn(&Meetups) + Send + Sync + 'static) {
        self.on(kind::MEETUPS, move |ev| {
            if let ChatEvent::Meetups(m) = ev {
                f(m)
            }
        });
    }
}
