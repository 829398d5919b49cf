//! Test support: an in-memory, channel-backed [`Transport`].
//!
//! Each `connect` hands the test a [`ServerEnd`] so it can observe the
//! frames the client wrote and inject transport events, playing the
//! role of the server.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::transport::{Connection, Frame, Transport, TransportEvent};

/// The server side of one in-memory connection.
pub struct ServerEnd {
    /// Handshake headers the client sent for this connect attempt.
    pub headers: Vec<(String, String)>,
    /// Frames the client wrote. `None` on recv means the client dropped
    /// the connection.
    pub sent: mpsc::Receiver<Frame>,
    /// Inject events (messages, closes, errors) toward the client.
    pub events: mpsc::Sender<TransportEvent>,
}

impl ServerEnd {
    /// Inject a text frame toward the client.
    pub async fn push_text(&self, frame: impl Into<String>) {
        self.events
            .send(TransportEvent::Message(frame.into()))
            .await
            .expect("client reader gone");
    }

    /// Inject a close toward the client.
    pub async fn push_close(&self, code: u16, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::Closed {
                code,
                reason: reason.to_string(),
            })
            .await;
    }

    /// Next text frame the client wrote, panicking on close/drop.
    pub async fn next_text(&mut self) -> String {
        match self.sent.recv().await {
            Some(Frame::Text(text)) => text,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// In-memory [`Transport`] for tests.
pub struct MemoryTransport {
    connects: AtomicUsize,
    fail_budget: AtomicUsize,
    accepts: mpsc::UnboundedSender<ServerEnd>,
}

impl MemoryTransport {
    /// Create a transport plus the receiver on which each accepted
    /// connection's [`ServerEnd`] arrives.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepts, accept_rx) = mpsc::unbounded_channel();
        (
            Self {
                connects: AtomicUsize::new(0),
                fail_budget: AtomicUsize::new(0),
                accepts,
            },
            accept_rx,
        )
    }

    /// Number of connect attempts seen so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    /// Make the next `n` connect attempts fail with a handshake error.
    pub fn fail_next_connects(&self, n: usize) {
        self.fail_budget.store(n, Ordering::Relaxed);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(
        &self,
        _url: &str,
        headers: &[(String, String)],
    ) -> Result<Connection, TransportError> {
        let _ = self.connects.fetch_add(1, Ordering::Relaxed);

        let remaining = self.fail_budget.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_budget.store(remaining - 1, Ordering::Relaxed);
            return Err(TransportError::Handshake("simulated refusal".into()));
        }

        let (outgoing_tx, outgoing_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        let _ = self.accepts.send(ServerEnd {
            headers: headers.to_vec(),
            sent: outgoing_rx,
            events: events_tx,
        });
        Ok(Connection {
            outgoing: outgoing_tx,
            events: events_rx,
        })
    }
}
