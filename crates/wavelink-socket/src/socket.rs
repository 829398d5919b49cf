//! The connection state machine.
//!
//! [`Socket`] owns one physical connection at a time and replaces it
//! wholesale on every reconnect. Three timer-driven tasks exist per
//! connection: heartbeat emission, watchdog stall detection, and (at
//! most one) scheduled reconnect attempt. The heartbeat and watchdog
//! are tied to a per-connection `CancellationToken` epoch so a stale
//! timer can never touch a newer connection.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use wavelink_core::constants::{
    CLOSE_CODE_ABNORMAL, CLOSE_CODE_NORMAL, HEARTBEAT_FRAME, PING_REPLY_FRAME,
};
use wavelink_core::types::OpenParams;
use wavelink_core::{Packet, PacketType};

use crate::session::SessionContext;
use crate::transport::{Connection, Frame, Transport, TransportEvent};

/// Connection lifecycle state. Transitions are edge-triggered:
/// re-setting the current state produces no notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Before the first connect attempt.
    Idle,
    /// Physical connection is open.
    Connected,
    /// Physical connection is gone (and may be reconnecting).
    Disconnected,
}

/// Callbacks delivered by the socket to the layer above.
///
/// All callbacks are invoked with the socket's state lock released, in
/// the order the corresponding edges/messages occurred.
pub trait SocketDelegate: Send + Sync {
    /// First-ever transition into `Connected`.
    fn on_connect(&self);
    /// Every subsequent transition into `Connected`.
    fn on_reconnect(&self);
    /// Transition into `Disconnected`.
    fn on_disconnect(&self);
    /// A `Message` packet arrived; `payload` is the envelope text.
    fn on_message(&self, payload: &str);
}

/// Which delegate notification a state edge produced.
#[derive(Clone, Copy, Debug)]
enum Edge {
    Connect,
    Reconnect,
    Disconnect,
}

/// Mutable engine state. Every mutation goes through this single lock.
struct SocketState {
    connection: ConnectionState,
    /// Intent flag: `connect()` sets it, `disconnect()` clears it.
    /// Reconnection and sends are suppressed while false.
    should_be_open: bool,
    /// Whether a `Connected` edge ever fired (first connect vs reconnect).
    was_connected: bool,
    /// Debounce: at most one pending reconnect attempt.
    reconnect_scheduled: bool,
    /// Evidence of server liveness since the last watchdog tick.
    watchdog_kicked: bool,
    /// Handshake parameters for the current connection, if received.
    handshake: Option<OpenParams>,
    /// Writer for the current connection.
    outgoing: Option<mpsc::Sender<Frame>>,
    /// Cancels every task tied to the current connection.
    epoch: CancellationToken,
    /// Per-timer child tokens, so a repeated `Open` replaces timers
    /// without tearing down the connection.
    heartbeat: Option<CancellationToken>,
    watchdog: Option<CancellationToken>,
    /// Connect-attempt counter; guards against a slow connect landing
    /// after a newer attempt or a disconnect.
    generation: u64,
}

struct SocketInner {
    url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn Transport>,
    session: SessionContext,
    delegate: Mutex<Option<Weak<dyn SocketDelegate>>>,
    state: Mutex<SocketState>,
}

/// The transport engine: one client connection's lifecycle.
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

impl Socket {
    /// Create an engine for `url`. No connection is opened until
    /// [`connect`](Self::connect) is called.
    pub fn new(
        url: impl Into<String>,
        api_version: u32,
        reconnect_delay: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                url: url.into(),
                reconnect_delay,
                transport,
                session: SessionContext::new(api_version),
                delegate: Mutex::new(None),
                state: Mutex::new(SocketState {
                    connection: ConnectionState::Idle,
                    should_be_open: false,
                    was_connected: false,
                    reconnect_scheduled: false,
                    watchdog_kicked: false,
                    handshake: None,
                    outgoing: None,
                    epoch: CancellationToken::new(),
                    heartbeat: None,
                    watchdog: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Install the delegate. Held weakly; a dropped delegate simply
    /// stops receiving notifications.
    pub fn set_delegate(&self, delegate: Weak<dyn SocketDelegate>) {
        *self.inner.delegate.lock() = Some(delegate);
    }

    /// The session context used for handshake credentials.
    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// Whether the socket is currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Handshake parameters of the current connection, if the `Open`
    /// packet has arrived.
    pub fn handshake(&self) -> Option<OpenParams> {
        self.inner.state.lock().handshake
    }

    /// Open the connection. Idempotent: a no-op while connected.
    pub fn connect(&self) {
        let inner = Arc::clone(&self.inner);
        {
            let mut st = inner.state.lock();
            if st.connection == ConnectionState::Connected {
                return;
            }
            st.should_be_open = true;
        }
        let _ = tokio::spawn(async move { inner.open_connection().await });
    }

    /// Close the connection and suppress all future reconnection.
    pub fn disconnect(&self) {
        debug!("closing socket");
        {
            let mut st = self.inner.state.lock();
            st.should_be_open = false;
            st.epoch.cancel();
            st.heartbeat = None;
            st.watchdog = None;
            st.handshake = None;
            if let Some(outgoing) = st.outgoing.take() {
                let _ = outgoing.try_send(Frame::Close(CLOSE_CODE_NORMAL));
            }
        }
        self.inner.transition(ConnectionState::Disconnected);
    }

    /// Send `raw` framed as a `Message` packet.
    ///
    /// Dropped silently unless the intent flag is set and the state is
    /// `Connected`. A dead writer at send time triggers a reconnect
    /// instead of surfacing an error.
    pub fn send(&self, raw: &str) {
        let outgoing = {
            let st = self.inner.state.lock();
            if !(st.should_be_open && st.connection == ConnectionState::Connected) {
                debug!("dropping send, socket not connected");
                return;
            }
            st.outgoing.clone()
        };
        let frame = Packet::message(raw).encode();
        let delivered = match outgoing {
            Some(tx) => tx.try_send(Frame::Text(frame)).is_ok(),
            None => false,
        };
        if !delivered {
            warn!("connection writer unavailable, trying to reconnect");
            self.inner.schedule_reconnect();
        }
    }
}

impl SocketInner {
    fn delegate(&self) -> Option<Arc<dyn SocketDelegate>> {
        self.delegate.lock().as_ref()?.upgrade()
    }

    /// Edge-triggered state transition; fires the delegate notification
    /// (outside the lock) only when the state actually changes.
    fn transition(&self, next: ConnectionState) {
        let edge = {
            let mut st = self.state.lock();
            if st.connection == next {
                None
            } else {
                st.connection = next;
                match next {
                    ConnectionState::Connected => {
                        let edge = if st.was_connected {
                            Edge::Reconnect
                        } else {
                            Edge::Connect
                        };
                        st.was_connected = true;
                        Some(edge)
                    }
                    ConnectionState::Disconnected => Some(Edge::Disconnect),
                    ConnectionState::Idle => None,
                }
            }
        };
        if let (Some(edge), Some(delegate)) = (edge, self.delegate()) {
            match edge {
                Edge::Connect => delegate.on_connect(),
                Edge::Reconnect => delegate.on_reconnect(),
                Edge::Disconnect => delegate.on_disconnect(),
            }
        }
    }

    async fn open_connection(self: Arc<Self>) {
        let generation = {
            let mut st = self.state.lock();
            if !st.should_be_open || st.connection == ConnectionState::Connected {
                return;
            }
            st.generation += 1;
            st.generation
        };
        let headers = self.session.handshake_headers();
        debug!(url = %self.url, "opening connection");
        match self.transport.connect(&self.url, &headers).await {
            Ok(connection) => self.install_connection(connection, generation),
            Err(e) => {
                warn!(error = %e, "could not open socket");
                self.schedule_reconnect();
            }
        }
    }

    fn install_connection(self: &Arc<Self>, connection: Connection, generation: u64) {
        let Connection { outgoing, events } = connection;
        let epoch = CancellationToken::new();
        {
            let mut st = self.state.lock();
            if st.generation != generation || !st.should_be_open {
                // a newer attempt or an explicit disconnect won the race
                debug!("discarding stale connection");
                return;
            }
            st.epoch.cancel();
            st.epoch = epoch.clone();
            st.outgoing = Some(outgoing);
            st.handshake = None;
            st.heartbeat = None;
            st.watchdog = None;
            st.watchdog_kicked = false;
        }
        self.transition(ConnectionState::Connected);
        self.spawn_reader(events, epoch);
    }

    fn spawn_reader(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
        epoch: CancellationToken,
    ) {
        let inner = Arc::clone(self);
        let _ = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = epoch.cancelled() => break,
                    event = events.recv() => match event {
                        Some(TransportEvent::Message(frame)) => inner.handle_frame(&frame),
                        Some(TransportEvent::Closed { code, reason }) => {
                            inner.handle_close(code, &reason);
                            break;
                        }
                        Some(TransportEvent::Error(err)) => {
                            error!(error = %err, "transport error");
                        }
                        None => break,
                    },
                }
            }
        });
    }

    /// Packet-type dispatch for one received frame.
    fn handle_frame(self: &Arc<Self>, frame: &str) {
        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, "dropping malformed frame");
                return;
            }
        };
        match packet.packet_type {
            PacketType::Open => self.handle_open(&packet.payload),
            PacketType::Close => {
                debug!("server requested close");
                self.send_raw_frame(Frame::Close(CLOSE_CODE_NORMAL));
            }
            PacketType::Ping => self.send_raw_frame(Frame::Text(PING_REPLY_FRAME.to_string())),
            PacketType::Pong => {
                // the server acknowledging our heartbeat
            }
            PacketType::Message => {
                self.kick_watchdog();
                if let Some(delegate) = self.delegate() {
                    delegate.on_message(&packet.payload);
                }
            }
            PacketType::Upgrade => {
                // reserved at this layer
            }
        }
    }

    fn handle_open(self: &Arc<Self>, payload: &str) {
        let params: OpenParams = match serde_json::from_str(payload) {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "dropping malformed open packet");
                return;
            }
        };
        // a zero period would stall the timer tasks outright
        if params.ping_interval == 0 || params.ping_timeout == 0 {
            warn!(
                ping_interval_ms = params.ping_interval,
                ping_timeout_ms = params.ping_timeout,
                "dropping open packet with zero timer period"
            );
            return;
        }
        debug!(
            ping_interval_ms = params.ping_interval,
            ping_timeout_ms = params.ping_timeout,
            "handshake parameters received"
        );
        let (heartbeat_token, watchdog_token) = {
            let mut st = self.state.lock();
            st.handshake = Some(params);
            st.watchdog_kicked = true;
            // a repeated Open replaces both timers
            if let Some(token) = st.heartbeat.take() {
                token.cancel();
            }
            if let Some(token) = st.watchdog.take() {
                token.cancel();
            }
            let heartbeat = st.epoch.child_token();
            let watchdog = st.epoch.child_token();
            st.heartbeat = Some(heartbeat.clone());
            st.watchdog = Some(watchdog.clone());
            (heartbeat, watchdog)
        };
        self.spawn_heartbeat(Duration::from_millis(params.ping_interval), heartbeat_token);
        self.spawn_watchdog(Duration::from_millis(params.ping_timeout), watchdog_token);
    }

    /// Heartbeat: send the fixed frame at every interval tick,
    /// irrespective of any response. The first tick is immediate.
    fn spawn_heartbeat(self: &Arc<Self>, interval: Duration, token: CancellationToken) {
        let inner = Arc::clone(self);
        let _ = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        inner.send_raw_frame(Frame::Text(HEARTBEAT_FRAME.to_string()));
                    }
                }
            }
        });
    }

    /// Watchdog: if no Open/Message arrived during a full window, the
    /// server is presumed unresponsive and the connection force-closed.
    fn spawn_watchdog(self: &Arc<Self>, window: Duration, token: CancellationToken) {
        let inner = Arc::clone(self);
        let _ = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if inner.watchdog_tick() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// One watchdog tick. Returns true when the connection was
    /// force-closed. The kicked flag resets every tick regardless.
    fn watchdog_tick(self: &Arc<Self>) -> bool {
        let tripped = {
            let mut st = self.state.lock();
            let tripped = !st.watchdog_kicked;
            st.watchdog_kicked = false;
            tripped
        };
        if tripped {
            warn!("watchdog is shutting down socket: server unresponsive");
            self.force_close();
        }
        tripped
    }

    fn kick_watchdog(&self) {
        self.state.lock().watchdog_kicked = true;
    }

    /// Tear down the current connection locally and run the
    /// abnormal-close path (close code never reaches the wire).
    fn force_close(self: &Arc<Self>) {
        {
            let mut st = self.state.lock();
            st.epoch.cancel();
            st.outgoing = None;
            st.heartbeat = None;
            st.watchdog = None;
        }
        self.handle_close(CLOSE_CODE_ABNORMAL, "server unresponsive");
    }

    fn handle_close(self: &Arc<Self>, code: u16, reason: &str) {
        warn!(code, reason, "connection lost");
        let should_reconnect = {
            let mut st = self.state.lock();
            st.epoch.cancel();
            st.outgoing = None;
            st.heartbeat = None;
            st.watchdog = None;
            st.handshake = None;
            st.should_be_open && code != CLOSE_CODE_NORMAL
        };
        self.transition(ConnectionState::Disconnected);
        if should_reconnect {
            self.schedule_reconnect();
        }
    }

    /// Schedule exactly one reconnect attempt after the fixed delay.
    /// Overlapping abnormal closes are debounced; the attempt re-checks
    /// the intent flag when it fires.
    fn schedule_reconnect(self: &Arc<Self>) {
        {
            let mut st = self.state.lock();
            if !st.should_be_open || st.reconnect_scheduled {
                return;
            }
            st.reconnect_scheduled = true;
        }
        debug!(delay = ?self.reconnect_delay, "reconnect scheduled");
        let inner = Arc::clone(self);
        let _ = tokio::spawn(async move {
            tokio::time::sleep(inner.reconnect_delay).await;
            let attempt = {
                let mut st = inner.state.lock();
                st.reconnect_scheduled = false;
                st.should_be_open
            };
            if attempt {
                Arc::clone(&inner).open_connection().await;
            }
        });
    }

    /// Write a pre-framed packet to the current connection, if any.
    fn send_raw_frame(&self, frame: Frame) {
        let outgoing = { self.state.lock().outgoing.clone() };
        if let Some(tx) = outgoing {
            if tx.try_send(frame).is_err() {
                debug!("dropping frame, connection writer unavailable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryTransport, ServerEnd};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct RecordingDelegate {
        log: Mutex<Vec<String>>,
    }

    impl RecordingDelegate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    impl SocketDelegate for RecordingDelegate {
        fn on_connect(&self) {
            self.log.lock().push("connect".into());
        }
        fn on_reconnect(&self) {
            self.log.lock().push("reconnect".into());
        }
        fn on_disconnect(&self) {
            self.log.lock().push("disconnect".into());
        }
        fn on_message(&self, payload: &str) {
            self.log.lock().push(format!("message:{payload}"));
        }
    }

    fn make_socket(
        delay: Duration,
    ) -> (
        Socket,
        Arc<RecordingDelegate>,
        Arc<MemoryTransport>,
        UnboundedReceiver<ServerEnd>,
    ) {
        let (transport, accepts) = MemoryTransport::new();
        let transport = Arc::new(transport);
        let socket = Socket::new(
            "ws://localhost:8056",
            1,
            delay,
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        let delegate = RecordingDelegate::new();
        let weak = Arc::downgrade(&delegate);
        let weak: Weak<dyn SocketDelegate> = weak;
        socket.set_delegate(weak);
        (socket, delegate, transport, accepts)
    }

    /// Let spawned engine tasks run to completion.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn connect_and_accept(
        socket: &Socket,
        accepts: &mut UnboundedReceiver<ServerEnd>,
    ) -> ServerEnd {
        socket.connect();
        let server = accepts.recv().await.expect("no connect attempt");
        settle().await;
        server
    }

    #[tokio::test]
    async fn starts_idle() {
        let (socket, _, _, _) = make_socket(Duration::from_millis(100));
        assert_eq!(socket.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn connect_fires_connect_edge_once() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(100));
        let _server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert_eq!(delegate.events(), vec!["connect"]);
    }

    #[tokio::test]
    async fn connect_while_connected_is_noop() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(100));
        let _server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        socket.connect();
        tokio::task::yield_now().await;
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn handshake_headers_carry_session() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(100));
        socket.session().set_session_id("s-1");
        let server = connect_and_accept(&socket, &mut accepts).await;
        assert_eq!(server.headers[0].1, "sessionId=s-1; apiVersion=1");
    }

    #[tokio::test]
    async fn message_packet_forwarded_to_delegate() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(100));
        let server = connect_and_accept(&socket, &mut accepts).await;
        server.push_text(r#"41|{"id":1,"p":[5]}"#).await;
        tokio::task::yield_now().await;
        assert!(
            delegate
                .events()
                .contains(&r#"message:1|{"id":1,"p":[5]}"#.to_string())
        );
    }

    #[tokio::test]
    async fn ping_packet_answered_with_probe() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(100));
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        server.push_text("2probe").await;
        assert_eq!(server.next_text().await, PING_REPLY_FRAME);
    }

    #[tokio::test]
    async fn malformed_frame_dropped() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(100));
        let server = connect_and_accept(&socket, &mut accepts).await;
        server.push_text("").await;
        server.push_text("9junk").await;
        server.push_text("4payload").await;
        tokio::task::yield_now().await;
        assert!(delegate.events().contains(&"message:payload".to_string()));
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn send_frames_as_message_packet() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(100));
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        socket.send(r#"1|{"id":1,"m":"math.add","p":[2,3]}"#);
        assert_eq!(
            server.next_text().await,
            r#"41|{"id":1,"m":"math.add","p":[2,3]}"#
        );
    }

    #[tokio::test]
    async fn send_while_disconnected_is_dropped() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(100));
        socket.send("1|ignored");
        // no connection was ever opened for this send
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        socket.send("1|kept");
        assert_eq!(server.next_text().await, "41|kept");
    }

    #[tokio::test]
    async fn disconnect_closes_normally_and_notifies_once() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(100));
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        socket.disconnect();
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        assert_eq!(server.sent.recv().await, Some(Frame::Close(CLOSE_CODE_NORMAL)));
        socket.disconnect();
        tokio::task::yield_now().await;
        assert_eq!(delegate.events(), vec!["connect", "disconnect"]);
    }

    #[tokio::test(start_paused = true)]
    async fn abnormal_close_reconnects_after_delay() {
        let (socket, delegate, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        server.push_close(1006, "dropped").await;

        let _server2 = accepts.recv().await.expect("no reconnect attempt");
        settle().await;
        assert_eq!(transport.connect_count(), 2);
        assert_eq!(delegate.events(), vec!["connect", "disconnect", "reconnect"]);
    }

    #[tokio::test(start_paused = true)]
    async fn normal_close_never_reconnects() {
        let (socket, delegate, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        server.push_close(CLOSE_CODE_NORMAL, "bye").await;
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(delegate.events(), vec!["connect", "disconnect"]);
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_failures_schedule_one_attempt() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        // the close and a failed send race within the same delay window
        server.push_close(1006, "dropped").await;
        tokio::task::yield_now().await;
        socket.send("1|while-down");
        tokio::task::yield_now().await;

        let _server2 = accepts.recv().await.expect("no reconnect attempt");
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        tokio::task::yield_now().await;
        server.push_close(1006, "dropped").await;
        tokio::task::yield_now().await;
        socket.disconnect();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_retries_while_intended_open() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        transport.fail_next_connects(1);
        socket.connect();
        let _server = accepts.recv().await.expect("no retry attempt");
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn open_packet_starts_heartbeat() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(2000));
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        server
            .push_text(r#"0{"pingInterval":25000,"pingTimeout":60000}"#)
            .await;

        // first heartbeat is immediate, then one per interval
        assert_eq!(server.next_text().await, HEARTBEAT_FRAME);
        let start = tokio::time::Instant::now();
        assert_eq!(server.next_text().await, HEARTBEAT_FRAME);
        assert_eq!(start.elapsed(), Duration::from_millis(25_000));
        assert_eq!(
            socket.handshake(),
            Some(OpenParams {
                ping_interval: 25_000,
                ping_timeout: 60_000
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_open_packet_is_dropped() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let mut server = connect_and_accept(&socket, &mut accepts).await;

        // neither timer may start from a zero period
        server
            .push_text(r#"0{"pingInterval":0,"pingTimeout":600000}"#)
            .await;
        server
            .push_text(r#"0{"pingInterval":25000,"pingTimeout":0}"#)
            .await;
        settle().await;
        assert_eq!(socket.handshake(), None);
        assert_eq!(socket.state(), ConnectionState::Connected);

        // a later well-formed open still brings the heartbeat up
        server
            .push_text(r#"0{"pingInterval":25000,"pingTimeout":60000}"#)
            .await;
        assert_eq!(server.next_text().await, HEARTBEAT_FRAME);
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_force_closes_idle_connection() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        server
            .push_text(r#"0{"pingInterval":600000,"pingTimeout":5000}"#)
            .await;
        tokio::task::yield_now().await;

        // nothing arrives for a full window: force close + reconnect
        let _server2 = accepts.recv().await.expect("no reconnect after watchdog");
        settle().await;
        let events = delegate.events();
        assert_eq!(events, vec!["connect", "disconnect", "reconnect"]);
        drop(socket);
    }

    #[tokio::test(start_paused = true)]
    async fn messages_keep_watchdog_quiet() {
        let (socket, _, transport, mut accepts) = make_socket(Duration::from_millis(2000));
        let server = connect_and_accept(&socket, &mut accepts).await;
        server
            .push_text(r#"0{"pingInterval":600000,"pingTimeout":5000}"#)
            .await;
        tokio::task::yield_now().await;

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(3000)).await;
            server.push_text("4keepalive|x").await;
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(socket.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn close_packet_initiates_graceful_close() {
        let (socket, _, _, mut accepts) = make_socket(Duration::from_millis(100));
        let mut server = connect_and_accept(&socket, &mut accepts).await;
        server.push_text("1").await;
        assert_eq!(server.sent.recv().await, Some(Frame::Close(CLOSE_CODE_NORMAL)));
        drop(socket);
    }

    #[tokio::test]
    async fn pong_and_upgrade_are_ignored() {
        let (socket, delegate, _, mut accepts) = make_socket(Duration::from_millis(100));
        let server = connect_and_accept(&socket, &mut accepts).await;
        server.push_text("3probe").await;
        server.push_text("5").await;
        server.push_text("4after|x").await;
        tokio::task::yield_now().await;
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert!(delegate.events().contains(&"message:after|x".to_string()));
    }
}
