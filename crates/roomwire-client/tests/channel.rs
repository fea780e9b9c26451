#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! Lifecycle tests against a scripted in-memory transport. All tests run on
//! a paused clock so backoff schedules are asserted exactly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use roomwire_client::channel::{ChannelSettings, ChatChannel, RoomChannel};
use roomwire_client::transport::{Connector, Transport};
use roomwire_core::error::{ChannelError, Result};
use roomwire_core::protocol::room::UserDescriptor;
use roomwire_core::ReconnectPolicy;

/// What the next `connect` call should do.
enum Plan {
    Accept,
    Refuse,
    Hang,
}

/// The server side of one accepted connection.
struct ServerEnd {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

#[derive(Clone)]
struct MockConnector {
    plans: Arc<Mutex<VecDeque<Plan>>>,
    sessions: mpsc::UnboundedSender<ServerEnd>,
    dials: Arc<AtomicU32>,
}

impl MockConnector {
    fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        (
            Self {
                plans: Arc::new(Mutex::new(VecDeque::new())),
                sessions,
                dials: Arc::new(AtomicU32::new(0)),
            },
            rx,
        )
    }

    fn plan(&self, plans: impl IntoIterator<Item = Plan>) {
        self.plans.lock().unwrap().extend(plans);
    }

    fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &str) -> Result<MockTransport> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Plan::Accept);
        match plan {
            Plan::Refuse => Err(ChannelError::ConnectionError("connection refused".into())),
            Plan::Hang => std::future::pending::<Result<MockTransport>>().await,
            Plan::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let closed = Arc::new(AtomicBool::new(false));
                let _ = self.sessions.send(ServerEnd {
                    to_client,
                    from_client,
                    closed: Arc::clone(&closed),
                });
                Ok(MockTransport {
                    inbound,
                    outbound,
                    closed,
                })
            }
        }
    }
}

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| ChannelError::ConnectionError("peer gone".into()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn settings() -> ChannelSettings {
    ChannelSettings::new("ws://test.invalid/ws")
}

fn user(id: &str) -> UserDescriptor {
    UserDescriptor {
        id: id.into(),
        name: id.into(),
        avatar: None,
    }
}

fn parse(frame: &str) -> serde_json::Value {
    serde_json::from_str(frame).unwrap()
}

/// Let spawned tasks run; the paused clock auto-advances past the 1 ms.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn connect_times_out_when_dial_hangs() {
    let (connector, _sessions) = MockConnector::new();
    connector.plan([Plan::Hang]);
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    let statuses = Arc::new(Mutex::new(Vec::<bool>::new()));
    let seen = Arc::clone(&statuses);
    channel.on_status(move |up| seen.lock().unwrap().push(up));

    let err = channel.connect().await.expect_err("must time out");
    assert!(matches!(err, ChannelError::ConnectionTimeout));
    assert!(!channel.is_connected());
    assert!(statuses.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent_while_connected() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    channel.connect().await.unwrap();
    settle().await;
    assert!(channel.is_connected());
    let _server = sessions.recv().await.unwrap();

    channel.connect().await.unwrap();
    assert_eq!(connector.dials(), 1);

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn outbound_messages_are_wrapped_in_envelopes() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();

    channel.join_room("lobby", user("u1")).unwrap();
    channel.send_message("hello there").unwrap();
    settle().await;

    let join = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(join["type"], "join_room");
    assert_eq!(join["data"]["room"], "lobby");
    assert_eq!(join["data"]["user"]["id"], "u1");
    assert!(join["timestamp"].is_u64());

    let chat = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(chat["type"], "chat_message");
    assert_eq!(chat["data"]["text"], "hello there");

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn inbound_frames_reach_every_subscriber() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    let first = Arc::new(Mutex::new(Vec::<String>::new()));
    let second = Arc::new(Mutex::new(Vec::<String>::new()));
    {
        let sink = Arc::clone(&first);
        channel.on_chat(move |m| sink.lock().unwrap().push(m.text.clone()));
        let sink = Arc::clone(&second);
        channel.on_chat(move |m| sink.lock().unwrap().push(m.text.clone()));
    }

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();

    server
        .to_client
        .send(r#"{"type":"chat_message","data":{"from":"ana","text":"hi"},"timestamp":1}"#.into())
        .unwrap();
    // Unknown types and heartbeat acks are dropped without reaching handlers.
    server
        .to_client
        .send(r#"{"type":"mystery","data":{}}"#.into())
        .unwrap();
    server
        .to_client
        .send(r#"{"type":"pong","timestamp":2}"#.into())
        .unwrap();
    server.to_client.send("not json".into()).unwrap();
    settle().await;

    assert_eq!(*first.lock().unwrap(), vec!["hi".to_string()]);
    assert_eq!(*second.lock().unwrap(), vec!["hi".to_string()]);
    assert!(channel.is_connected());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_every_interval() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();
    settle().await;
    assert!(server.from_client.try_recv().is_err());

    tokio::time::sleep(Duration::from_millis(30_050)).await;
    let ping = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(ping["type"], "ping");
    assert!(ping.get("data").is_none());

    tokio::time::sleep(Duration::from_millis(30_050)).await;
    let ping = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(ping["type"], "ping");

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_with_backoff_and_rejoins_once() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    let statuses = Arc::new(Mutex::new(Vec::<bool>::new()));
    let seen = Arc::clone(&statuses);
    channel.on_status(move |up| seen.lock().unwrap().push(up));

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();
    channel.join_room("lobby", user("u1")).unwrap();
    settle().await;
    let join = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(join["type"], "join_room");

    // First redial is refused, second accepted: 1 s then +2 s.
    connector.plan([Plan::Refuse, Plan::Accept]);
    drop(server);
    settle().await;
    assert!(!channel.is_connected());
    assert_eq!(connector.dials(), 1);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(connector.dials(), 2);
    assert!(!channel.is_connected());

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(connector.dials(), 3);
    assert!(channel.is_connected());
    assert_eq!(*statuses.lock().unwrap(), vec![true, false, true]);

    let mut server = sessions.recv().await.unwrap();
    settle().await;
    let rejoin = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(rejoin["type"], "rejoin_room");
    assert_eq!(rejoin["data"]["room"], "lobby");
    // Exactly one membership frame per successful connect.
    assert!(server.from_client.try_recv().is_err());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn deferred_join_is_sent_on_connect() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    // Join while disconnected: nothing goes on the wire yet.
    channel.join_room("lobby", user("u1")).unwrap();

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();
    settle().await;
    let join = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(join["type"], "join_room");
    assert_eq!(join["data"]["user"]["id"], "u1");
    assert!(server.from_client.try_recv().is_err());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();

    connector.plan([
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
    ]);
    drop(server);
    // Full schedule: 1 + 2 + 4 + 8 + 16 s.
    tokio::time::sleep(Duration::from_millis(32_000)).await;
    assert_eq!(connector.dials(), 6);

    // Budget exhausted: no more dials, ever.
    tokio::time::sleep(Duration::from_millis(120_000)).await;
    assert_eq!(connector.dials(), 6);
    assert!(!channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn wake_redials_immediately_after_giving_up() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();

    connector.plan([
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
        Plan::Refuse,
    ]);
    drop(server);
    tokio::time::sleep(Duration::from_millis(32_000)).await;
    assert_eq!(connector.dials(), 6);

    channel.wake();
    settle().await;
    assert_eq!(connector.dials(), 7);
    assert!(channel.is_connected());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn wake_mid_backoff_redials_immediately() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();
    drop(server);
    settle().await;
    assert!(!channel.is_connected());
    assert_eq!(connector.dials(), 1);

    // 10 ms into the 1 s backoff window: wake must not wait it out.
    tokio::time::sleep(Duration::from_millis(10)).await;
    channel.wake();
    settle().await;
    assert_eq!(connector.dials(), 2);
    assert!(channel.is_connected());

    // The replaced backoff timer never fires a duplicate dial.
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(connector.dials(), 2);

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector.clone());

    let statuses = Arc::new(Mutex::new(Vec::<bool>::new()));
    let seen = Arc::clone(&statuses);
    channel.on_status(move |up| seen.lock().unwrap().push(up));

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();
    drop(server);
    settle().await;
    assert!(!channel.is_connected());

    channel.disconnect().await;
    tokio::time::sleep(Duration::from_millis(120_000)).await;
    assert_eq!(connector.dials(), 1);
    assert_eq!(*statuses.lock().unwrap(), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_the_transport() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();

    channel.disconnect().await;
    assert!(server.closed.load(Ordering::SeqCst));
    assert!(!channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn offline_messages_flush_in_order_on_reconnect() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings(), connector);

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();
    drop(server);
    settle().await;

    channel.send_message("one").unwrap();
    channel.send_message("two").unwrap();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let mut server = sessions.recv().await.unwrap();
    settle().await;
    let first = parse(&server.from_client.recv().await.unwrap());
    let second = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(first["data"]["text"], "one");
    assert_eq!(second["data"]["text"], "two");

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn offline_queue_drops_oldest_when_full() {
    let (connector, mut sessions) = MockConnector::new();
    let mut settings = settings();
    settings.outbound_queue = 2;
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings, connector);

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();
    drop(server);
    settle().await;

    channel.send_message("one").unwrap();
    channel.send_message("two").unwrap();
    channel.send_message("three").unwrap();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let mut server = sessions.recv().await.unwrap();
    settle().await;
    let first = parse(&server.from_client.recv().await.unwrap());
    let second = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(first["data"]["text"], "two");
    assert_eq!(second["data"]["text"], "three");
    assert!(server.from_client.try_recv().is_err());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn live_session_overflow_drops_instead_of_queueing() {
    let (connector, mut sessions) = MockConnector::new();
    let mut settings = settings();
    settings.outbound_queue = 2;
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings, connector);

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();

    // No await between sends, so the session task cannot drain: the third
    // frame overflows the live buffer and is dropped on the spot.
    channel.send_message("one").unwrap();
    channel.send_message("two").unwrap();
    channel.send_message("three").unwrap();
    settle().await;

    let first = parse(&server.from_client.recv().await.unwrap());
    let second = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(first["data"]["text"], "one");
    assert_eq!(second["data"]["text"], "two");
    assert!(server.from_client.try_recv().is_err());

    // The dropped frame must not resurface from the offline queue later.
    drop(server);
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let mut server = sessions.recv().await.unwrap();
    settle().await;
    assert!(server.from_client.try_recv().is_err());

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn chat_channel_clamps_whiteboard_coordinates() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: ChatChannel<MockConnector> = ChatChannel::new(settings(), connector);

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();

    channel.send_draw(1.5, -0.25, "#ff0000", 4.0).unwrap();
    settle().await;

    let draw = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(draw["type"], "whiteboard");
    assert_eq!(draw["data"]["action"], "draw");
    assert_eq!(draw["data"]["x"], 1.0);
    assert_eq!(draw["data"]["y"], 0.0);
    assert_eq!(draw["data"]["color"], "#ff0000");

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn chat_channel_round_trip() {
    let (connector, mut sessions) = MockConnector::new();
    let channel: ChatChannel<MockConnector> = ChatChannel::new(settings(), connector);

    let seen = Arc::new(Mutex::new(Vec::<(String, String)>::new()));
    {
        let sink = Arc::clone(&seen);
        channel.on_chat(move |m| sink.lock().unwrap().push((m.user.clone(), m.text.clone())));
    }

    channel.connect().await.unwrap();
    let mut server = sessions.recv().await.unwrap();

    channel.send_chat("ana", "hello").unwrap();
    settle().await;
    let frame = parse(&server.from_client.recv().await.unwrap());
    assert_eq!(frame["type"], "chat");
    assert_eq!(frame["data"]["user"], "ana");

    server
        .to_client
        .send(r#"{"type":"chat","data":{"user":"bo","text":"hey"},"timestamp":9}"#.into())
        .unwrap();
    settle().await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("bo".to_string(), "hey".to_string())]
    );

    channel.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn custom_policy_shapes_the_schedule() {
    let (connector, mut sessions) = MockConnector::new();
    let mut settings = settings();
    settings.policy = ReconnectPolicy::new(2, Duration::from_millis(500));
    let channel: RoomChannel<MockConnector> = RoomChannel::new(settings, connector.clone());

    channel.connect().await.unwrap();
    let server = sessions.recv().await.unwrap();
    connector.plan([Plan::Refuse, Plan::Refuse]);
    drop(server);

    // 500 ms then 1 s, then give up.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(connector.dials(), 2);
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(connector.dials(), 3);
    tokio::time::sleep(Duration::from_millis(60_000)).await;
    assert_eq!(connector.dials(), 3);
}
