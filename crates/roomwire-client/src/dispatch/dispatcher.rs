use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use roomwire_core::error::ChannelError;
use roomwire_core::protocol::envelope::Envelope;
use roomwire_core::protocol::{ChannelProtocol, EventKind, PONG};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registry and fan-out for one channel's inbound events.
///
/// Handlers are keyed by wire `type` and registration appends: a later `on`
/// never replaces an earlier subscriber. `dispatch` swallows malformed frames
/// and unknown types (logged, dropped) so a single bad frame — or a newer
/// server speaking types this client predates — can never tear down the
/// connection or crash a consumer.
pub struct Dispatcher<P: ChannelProtocol> {
    handlers: DashMap<&'static str, Vec<Handler<P::Event>>>,
    _protocol: PhantomData<P>,
}

impl<P: ChannelProtocol> Default for Dispatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ChannelProtocol> Dispatcher<P> {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            _protocol: PhantomData,
        }
    }

    /// Register a handler for one wire type. Multi-subscriber: appends.
    pub fn on(&self, kind: &'static str, handler: impl Fn(&P::Event) + Send + Sync + 'static) {
        if !P::KINDS.contains(&kind) {
            tracing::warn!(kind, "registering handler for unrecognized message type");
        }
        self.handlers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// Route one raw text frame to the registered handlers.
    pub fn dispatch(&self, raw: &str) {
        let env = match Envelope::parse(raw) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(code = e.kind(), error = %e, "dropping malformed frame");
                return;
            }
        };

        // Liveness ack for the heartbeat; shared by both channels.
        if env.kind == PONG {
            tracing::debug!("pong received");
            return;
        }

        let event = match P::decode(&env) {
            Ok(event) => event,
            Err(ChannelError::UnknownMessageType(kind)) => {
                tracing::warn!(kind = %kind, "dropping frame with unknown type");
                return;
            }
            Err(e) => {
                tracing::warn!(kind = %env.kind, code = e.kind(), error = %e, "dropping undecodable frame");
                return;
            }
        };

        let handlers = match self.handlers.get(event.kind()) {
            Some(entry) => entry.value().clone(),
            None => {
                tracing::debug!(kind = event.kind(), "no handler registered");
                return;
            }
        };
        for handler in &handlers {
            handler(&event);
        }
    }
}
