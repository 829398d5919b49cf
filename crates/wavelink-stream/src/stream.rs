//! The [`Stream`]: channel multiplexer over a [`Socket`].
//!
//! One logical stream owns one transport engine and demultiplexes its
//! messages into three sub-protocols: broadcast events dispatched to
//! bound callbacks, RPC responses correlated back to their one-shot
//! callbacks, and session-control messages that rotate the handshake
//! credential. Binding and calling are valid in any connection state;
//! registrations survive reconnects.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, warn};

use wavelink_core::envelope::strip_event_footer;
use wavelink_core::types::{EventBody, RpcRequest, RpcResponse, SessionIssued};
use wavelink_core::{Envelope, EnvelopeKind};
use wavelink_settings::StreamConfig;
use wavelink_socket::{Socket, SocketDelegate, Transport, WsTransport};

/// A subscription callback. Cloned out of the binding table before
/// invocation, so a callback may re-enter the [`Stream`] freely.
pub type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

type RpcCallback = Box<dyn FnOnce(&[Value]) + Send>;

/// Application-level lifecycle and session hooks.
///
/// All notifications arrive on the engine's async tasks; implementations
/// must not block.
pub trait StreamDelegate: Send + Sync {
    /// First successful connection of this stream's lifetime.
    fn stream_did_connect(&self) {}

    /// A later successful connection, after at least one loss.
    fn stream_did_reconnect(&self) {}

    /// The connection was lost or closed.
    fn stream_did_disconnect(&self) {}

    /// The server issued a session id. Return the credential to use on
    /// subsequent handshakes, or `None` to leave it unchanged.
    fn did_issue_session_id(&self, session_id: &str) -> Option<String> {
        let _ = session_id;
        None
    }
}

struct Tables {
    /// Per-channel subscribers, in binding order. Never removed.
    bindings: HashMap<String, Vec<EventCallback>>,
    /// Outstanding RPC calls by correlation id.
    pending: HashMap<u64, RpcCallback>,
    /// Next correlation id; monotonically increasing, never reused.
    next_rpc_id: u64,
}

/// The multiplexed client: pub/sub events plus correlated RPC over one
/// reconnecting socket.
pub struct Stream {
    socket: Socket,
    delegate: Mutex<Option<Weak<dyn StreamDelegate>>>,
    tables: Mutex<Tables>,
}

impl Stream {
    /// Create a stream over the production WebSocket transport.
    pub fn new(config: &StreamConfig) -> Arc<Self> {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// Create a stream over an arbitrary transport.
    pub fn with_transport(config: &StreamConfig, transport: Arc<dyn Transport>) -> Arc<Self> {
        let socket = Socket::new(
            config.url(),
            config.api_version,
            Duration::from_millis(config.reconnect_delay_ms),
            transport,
        );
        let stream = Arc::new(Self {
            socket,
            delegate: Mutex::new(None),
            tables: Mutex::new(Tables {
                bindings: HashMap::new(),
                pending: HashMap::new(),
                next_rpc_id: 1,
            }),
        });
        let weak = Arc::downgrade(&stream);
        let weak: Weak<dyn SocketDelegate> = weak;
        stream.socket.set_delegate(weak);
        stream
    }

    /// Install the delegate. Held weakly.
    pub fn set_delegate(&self, delegate: Weak<dyn StreamDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    /// Set the handshake session credential for future connects.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        self.socket.session().set_session_id(session_id);
    }

    /// Set the handshake protocol version for future connects.
    pub fn set_api_version(&self, api_version: u32) {
        self.socket.session().set_api_version(api_version);
    }

    /// Open the stream. Idempotent while connected.
    pub fn connect(&self) {
        self.socket.connect();
    }

    /// Close the stream and suppress reconnection. Bindings and pending
    /// calls are retained.
    pub fn disconnect(&self) {
        self.socket.disconnect();
    }

    /// Whether the underlying socket is currently connected.
    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    /// Number of RPC calls still awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.tables.lock().pending.len()
    }

    /// Subscribe `callback` to `channel`. Subscriptions are permanent
    /// and a channel may hold any number of them; each event invokes
    /// them in binding order.
    pub fn bind(
        &self,
        channel: impl Into<String>,
        callback: impl Fn(&[Value]) + Send + Sync + 'static,
    ) {
        let mut tables = self.tables.lock();
        tables
            .bindings
            .entry(channel.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Issue an RPC call. `callback` fires at most once, when a response
    /// with the matching id arrives; a lost response leaves it pending
    /// forever. While disconnected the request goes nowhere, but the
    /// callback is still registered and the id still burned.
    pub fn call(
        &self,
        method: &str,
        params: Value,
        callback: impl FnOnce(&[Value]) + Send + 'static,
    ) {
        // id allocation, registration and send stay under one lock so a
        // response cannot race its own registration
        let mut tables = self.tables.lock();
        let id = tables.next_rpc_id;
        tables.next_rpc_id += 1;

        let request = RpcRequest::new(id, method, params);
        match serde_json::to_string(&request) {
            Ok(body) => {
                debug!(id, method, "issuing call");
                self.socket.send(&Envelope::rpc(body).encode());
            }
            Err(e) => {
                error!(id, method, error = %e, "could not serialize call");
            }
        }
        let _ = tables.pending.insert(id, Box::new(callback));
    }

    fn delegate(&self) -> Option<Arc<dyn StreamDelegate>> {
        self.delegate.lock().as_ref()?.upgrade()
    }

    /// `Event` envelope: strip the footer, look up the channel's
    /// subscribers and invoke them in order with the lock released.
    fn handle_event(&self, body: &str) {
        let json = match strip_event_footer(body) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "dropping improperly formatted event");
                return;
            }
        };
        let event: EventBody = match serde_json::from_str(json) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "dropping undecodable event body");
                return;
            }
        };

        let callbacks: Vec<EventCallback> = {
            let tables = self.tables.lock();
            tables
                .bindings
                .get(&event.channel)
                .cloned()
                .unwrap_or_default()
        };
        if callbacks.is_empty() {
            debug!(channel = %event.channel, "event on channel with no subscribers");
            return;
        }

        let params = event.params.unwrap_or_default();
        debug!(
            channel = %event.channel,
            subscribers = callbacks.len(),
            "dispatching event"
        );
        for callback in callbacks {
            callback(&params);
        }
    }

    /// `Rpc` envelope: correlate by id and consume the callback.
    fn handle_rpc(&self, body: &str) {
        let response: RpcResponse = match serde_json::from_str(body) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "dropping undecodable rpc response");
                return;
            }
        };
        let callback = self.tables.lock().pending.remove(&response.id);
        match callback {
            Some(callback) => {
                debug!(id = response.id, "rpc response");
                let results = response.results.unwrap_or_default();
                callback(&results);
            }
            None => warn!(id = response.id, "rpc response with no registered call"),
        }
    }

    /// `System` envelope: session-id rotation.
    fn handle_system(&self, body: &str) {
        let issued: SessionIssued = match serde_json::from_str(body) {
            Ok(issued) => issued,
            Err(e) => {
                warn!(error = %e, "dropping undecodable session message");
                return;
            }
        };
        debug!(session_id = %issued.session_id, "server issued session id");
        let replacement = self
            .delegate()
            .and_then(|d| d.did_issue_session_id(&issued.session_id));
        if let Some(credential) = replacement.filter(|c| !c.is_empty()) {
            self.socket.session().set_session_id(credential);
        }
    }
}

impl SocketDelegate for Stream {
    fn on_connect(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.stream_did_connect();
        }
    }

    fn on_reconnect(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.stream_did_reconnect();
        }
    }

    fn on_disconnect(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.stream_did_disconnect();
        }
    }

    fn on_message(&self, payload: &str) {
        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed envelope");
                return;
            }
        };
        match envelope.kind {
            EnvelopeKind::Event => self.handle_event(&envelope.body),
            EnvelopeKind::Rpc => self.handle_rpc(&envelope.body),
            EnvelopeKind::System => self.handle_system(&envelope.body),
        }
    }
}
