//! Connection lifecycle manager.
//!
//! [`Channel`] owns the socket: it dials with a timeout, runs one session
//! task that multiplexes outbound traffic, inbound dispatch, and the
//! heartbeat, and schedules exponential-backoff reconnects when the server
//! closes the connection unexpectedly. Both realtime channels (room and
//! chat) are instances of the same generic type; they differ only in the
//! [`ChannelProtocol`] they carry.

mod chat;
mod room;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use roomwire_core::error::{ChannelError, Result};
use roomwire_core::protocol::envelope::Envelope;
use roomwire_core::protocol::room::UserDescriptor;
use roomwire_core::protocol::{ChannelProtocol, PING};
use roomwire_core::ReconnectPolicy;

use crate::config::ChannelSection;
use crate::dispatch::Dispatcher;
use crate::transport::{Connector, Transport};

pub use chat::ChatChannel;
pub use room::RoomChannel;

/// How long `disconnect` waits for the session task to close gracefully
/// before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Runtime settings for one channel.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    /// Capacity of both the session buffer and the offline pending queue.
    pub outbound_queue: usize,
    pub policy: ReconnectPolicy,
}

impl ChannelSettings {
    /// Defaults matching the wire contract: 5 s connect timeout, 30 s
    /// heartbeat, 5 reconnect attempts starting at 1 s.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_millis(5000),
            ping_interval: Duration::from_millis(30000),
            outbound_queue: 64,
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn from_config(section: &ChannelSection) -> Self {
        Self {
            url: section.url.clone(),
            connect_timeout: Duration::from_millis(section.connect_timeout_ms),
            ping_interval: Duration::from_millis(section.ping_interval_ms),
            outbound_queue: section.outbound_queue,
            policy: ReconnectPolicy::new(
                section.reconnect.max_attempts,
                Duration::from_millis(section.reconnect.base_delay_ms),
            ),
        }
    }
}

/// Room membership replayed after (re)connection.
#[derive(Debug, Clone)]
struct Membership {
    room: String,
    user: Option<UserDescriptor>,
    /// Whether the server has already seen this join. A deferred first join
    /// is announced with `join_room`; anything after that with `rejoin_room`.
    announced: bool,
}

struct SessionHandle {
    tx: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

/// Connection-status fan-out. Multi-subscriber, notified on edges only.
struct StatusHub {
    connected: AtomicBool,
    subscribers: RwLock<Vec<Arc<dyn Fn(bool) + Send + Sync>>>,
}

impl StatusHub {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn on(&self, f: impl Fn(bool) + Send + Sync + 'static) {
        self.subscribers.write().unwrap().push(Arc::new(f));
    }

    fn set(&self, up: bool) {
        if self.connected.swap(up, Ordering::AcqRel) == up {
            return;
        }
        let subs = self.subscribers.read().unwrap().clone();
        for sub in &subs {
            sub(up);
        }
    }
}

struct Inner<P: ChannelProtocol, C: Connector> {
    settings: ChannelSettings,
    connector: C,
    dispatcher: Dispatcher<P>,
    status: StatusHub,
    session: Mutex<Option<SessionHandle>>,
    /// Bounded offline queue, flushed on reconnect. Overflow drops oldest.
    pending: Mutex<VecDeque<String>>,
    membership: Mutex<Option<Membership>>,
    attempts: AtomicU32,
    shutting_down: AtomicBool,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    /// Bumped per install; lets a superseded session skip teardown.
    epoch: AtomicU64,
}

/// A reconnecting realtime channel. Cheap to clone; all clones share one
/// connection.
pub struct Channel<P: ChannelProtocol, C: Connector> {
    inner: Arc<Inner<P, C>>,
}

impl<P: ChannelProtocol, C: Connector> Clone for Channel<P, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ChannelProtocol, C: Connector> Channel<P, C> {
    pub fn new(settings: ChannelSettings, connector: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                connector,
                dispatcher: Dispatcher::new(),
                status: StatusHub::new(),
                session: Mutex::new(None),
                pending: Mutex::new(VecDeque::new()),
                membership: Mutex::new(None),
                attempts: AtomicU32::new(0),
                shutting_down: AtomicBool::new(false),
                reconnect_task: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Dial the configured URL. Resolves once the socket is open; fails with
    /// `ConnectionTimeout` if it neither opens nor errors within the
    /// configured window, or `ConnectionError` on transport failure.
    pub async fn connect(&self) -> Result<()> {
        self.inner.shutting_down.store(false, Ordering::Release);
        if self.inner.status.is_connected() {
            return Ok(());
        }
        Arc::clone(&self.inner).dial().await
    }

    /// Idempotent teardown: cancels any reconnect timer, stops the heartbeat,
    /// and closes the socket. No status callback fires after this returns.
    pub async fn disconnect(&self) {
        self.inner.shutting_down.store(true, Ordering::Release);

        let reconnect = self.inner.reconnect_task.lock().unwrap().take();
        if let Some(task) = reconnect {
            task.abort();
        }

        let session = self.inner.session.lock().unwrap().take();
        if let Some(SessionHandle { tx, mut task }) = session {
            // Dropping the sender ends the run loop, which closes the
            // transport on its way out.
            drop(tx);
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task)
                .await
                .is_err()
            {
                tracing::warn!("session did not close in time; aborting");
                task.abort();
            }
        }

        self.inner.status.set(false);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.status.is_connected()
    }

    /// Subscribe to connection-status edges. Multi-subscriber: appends.
    pub fn on_status(&self, f: impl Fn(bool) + Send + Sync + 'static) {
        self.inner.status.on(f);
    }

    /// Register an inbound handler for one wire type. Multi-subscriber.
    pub fn on(&self, kind: &'static str, handler: impl Fn(&P::Event) + Send + Sync + 'static) {
        self.inner.dispatcher.on(kind, handler);
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.inner.dispatcher
    }

    /// Host-visibility hook: if the channel is disconnected (and not shut
    /// down), cancel any backoff timer and attempt an immediate reconnect.
    /// Call this when the embedding application returns to the foreground.
    pub fn wake(&self) {
        if self.is_connected() || self.inner.shutting_down.load(Ordering::Acquire) {
            return;
        }
        tracing::info!("wake: immediate reconnect requested");
        self.inner.attempts.store(0, Ordering::Release);
        Arc::clone(&self.inner).spawn_reconnect(true);
    }

    /// Wrap a payload in an envelope (stamping the timestamp) and queue it.
    /// When disconnected the frame lands in the bounded pending queue and is
    /// flushed on reconnect.
    pub fn send_event<T: Serialize>(&self, kind: &str, data: &T) -> Result<()> {
        let frame = Envelope::encode(kind, data)?;
        self.inner.enqueue(frame);
        Ok(())
    }

    /// Send a raw heartbeat ping now.
    pub fn ping(&self) -> Result<()> {
        let frame = Envelope::encode_bare(PING)?;
        self.inner.enqueue(frame);
        Ok(())
    }

    /// Send only if a session is live; silently dropped otherwise. Used for
    /// membership traffic, which is replayed on connect rather than queued.
    fn send_now<T: Serialize>(&self, kind: &str, data: &T) -> Result<()> {
        let frame = Envelope::encode(kind, data)?;
        let tx = {
            let session = self.inner.session.lock().unwrap();
            session.as_ref().map(|s| s.tx.clone())
        };
        match tx {
            Some(tx) => {
                if let Err(e) = tx.try_send(frame) {
                    tracing::warn!(kind, error = %e, "session buffer rejected frame");
                }
            }
            None => tracing::debug!(kind, "not connected; membership replay will cover this"),
        }
        Ok(())
    }

    fn set_membership(&self, membership: Option<Membership>) {
        *self.inner.membership.lock().unwrap() = membership;
    }

    fn take_membership(&self) -> Option<(String, Option<UserDescriptor>)> {
        self.inner
            .membership
            .lock()
            .unwrap()
            .take()
            .map(|m| (m.room, m.user))
    }
}

impl<P: ChannelProtocol, C: Connector> Inner<P, C> {
    async fn dial(self: Arc<Self>) -> Result<()> {
        let transport = tokio::time::timeout(
            self.settings.connect_timeout,
            self.connector.connect(&self.settings.url),
        )
        .await
        .map_err(|_| ChannelError::ConnectionTimeout)??;
        self.install(transport);
        Ok(())
    }

    /// Wire a freshly opened transport: reset the attempt counter, replay
    /// membership, flush the pending queue, start the session task, and
    /// notify status subscribers.
    fn install(self: Arc<Self>, transport: C::Transport) {
        self.attempts.store(0, Ordering::Release);

        let (tx, rx) = mpsc::channel::<String>(self.settings.outbound_queue.max(1));

        if let Some(frame) = self.membership_replay_frame() {
            if tx.try_send(frame).is_err() {
                tracing::warn!("session buffer rejected membership replay");
            }
        }

        let queued: Vec<String> = self.pending.lock().unwrap().drain(..).collect();
        if !queued.is_empty() {
            tracing::info!(count = queued.len(), "flushing queued messages");
            for frame in queued {
                if tx.try_send(frame).is_err() {
                    tracing::warn!("session buffer full during flush; dropping message");
                }
            }
        }

        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let task = tokio::spawn(Arc::clone(&self).run_session(transport, rx, epoch));
        *self.session.lock().unwrap() = Some(SessionHandle { tx, task });
        self.status.set(true);
    }

    /// Exactly one of `join_room` / `rejoin_room` per successful connect:
    /// `join_room` if the join was deferred while offline, `rejoin_room` if
    /// the server has already seen this join.
    fn membership_replay_frame(&self) -> Option<String> {
        let mut guard = self.membership.lock().unwrap();
        let membership = guard.as_mut()?;
        let result = if membership.announced {
            tracing::info!(room = %membership.room, "replaying room membership");
            Envelope::encode(
                roomwire_core::protocol::room::kind::REJOIN_ROOM,
                &roomwire_core::protocol::room::RejoinRoom {
                    room: membership.room.clone(),
                },
            )
        } else {
            match membership.user.clone() {
                Some(user) => {
                    membership.announced = true;
                    tracing::info!(room = %membership.room, "announcing deferred join");
                    Envelope::encode(
                        roomwire_core::protocol::room::kind::JOIN_ROOM,
                        &roomwire_core::protocol::room::JoinRoom {
                            room: membership.room.clone(),
                            user,
                        },
                    )
                }
                None => return None,
            }
        };
        match result {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, "membership replay encode failed");
                None
            }
        }
    }

    async fn run_session(
        self: Arc<Self>,
        mut transport: C::Transport,
        mut rx: mpsc::Receiver<String>,
        epoch: u64,
    ) {
        let mut heartbeat = tokio::time::interval(self.settings.ping_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval fires immediately; consume the zeroth tick so the
        // first ping goes out one full period after connect.
        heartbeat.tick().await;

        let explicit_close = loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            if let Err(e) = transport.send(frame).await {
                                tracing::warn!(error = %e, "send failed; closing session");
                                break false;
                            }
                        }
                        // All senders dropped: explicit disconnect.
                        None => break true,
                    }
                }

                inbound = transport.recv() => {
                    match inbound {
                        Some(Ok(text)) => self.dispatcher.dispatch(&text),
                        // Errors alone never trigger reconnect; the close
                        // that follows does. Avoids double-triggering.
                        Some(Err(e)) => tracing::warn!(error = %e, "transport error"),
                        None => {
                            tracing::info!("server closed connection");
                            break false;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    match Envelope::encode_bare(PING) {
                        Ok(frame) => {
                            if let Err(e) = transport.send(frame).await {
                                tracing::warn!(error = %e, "heartbeat failed; closing session");
                                break false;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "heartbeat encode failed"),
                    }
                }
            }
        };

        if explicit_close {
            let _ = transport.close().await;
        }

        // A newer session may already have replaced this one; only the
        // current epoch owns teardown. A disconnect() may also have taken
        // the handle already; this take is for the unexpected-close path.
        if self.epoch.load(Ordering::Acquire) != epoch {
            return;
        }
        self.session.lock().unwrap().take();
        self.status.set(false);

        if explicit_close || self.shutting_down.load(Ordering::Acquire) {
            return;
        }
        self.spawn_reconnect(false);
    }

    fn enqueue(&self, frame: String) {
        let tx = {
            let session = self.session.lock().unwrap();
            session.as_ref().map(|s| s.tx.clone())
        };
        if let Some(tx) = tx {
            match tx.try_send(frame) {
                Ok(()) => {}
                // A live session that cannot keep up loses the frame now;
                // deferring it to the pending queue would replay it out of
                // order after some future reconnect.
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("session buffer full; dropping message");
                }
                // The session is tearing down; treat as disconnected.
                Err(TrySendError::Closed(frame)) => self.buffer(frame),
            }
            return;
        }
        self.buffer(frame);
    }

    fn buffer(&self, frame: String) {
        let mut queue = self.pending.lock().unwrap();
        if queue.len() >= self.settings.outbound_queue {
            queue.pop_front();
            tracing::warn!("outbound queue full; dropping oldest message");
        }
        queue.push_back(frame);
        tracing::debug!(queued = queue.len(), "not connected; message buffered");
    }

    /// Start (or restart) the reconnect loop. `immediate` skips the backoff
    /// delay and budget for the first attempt (wake path).
    fn spawn_reconnect(self: Arc<Self>, immediate: bool) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }
        let inner = Arc::clone(&self);
        let task = tokio::spawn(async move {
            let mut skip_backoff = immediate;
            loop {
                if inner.shutting_down.load(Ordering::Acquire) {
                    return;
                }
                if !skip_backoff {
                    let attempt = inner.attempts.fetch_add(1, Ordering::AcqRel) + 1;
                    if !inner.settings.policy.allows(attempt) {
                        tracing::error!(
                            code = ChannelError::MaxReconnectAttemptsExceeded.kind(),
                            max = inner.settings.policy.max_attempts,
                            "giving up on automatic reconnection"
                        );
                        return;
                    }
                    let delay = inner.settings.policy.delay_for(attempt);
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "reconnect scheduled"
                    );
                    tokio::time::sleep(delay).await;
                }
                skip_backoff = false;

                if inner.shutting_down.load(Ordering::Acquire) || inner.status.is_connected() {
                    return;
                }
                match Arc::clone(&inner).dial().await {
                    Ok(()) => {
                        tracing::info!("reconnected");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(code = e.kind(), error = %e, "reconnect attempt failed")
                    }
                }
            }
        });
        if let Some(prev) = self.reconnect_task.lock().unwrap().replace(task) {
            prev.abort();
        }
    }
}
