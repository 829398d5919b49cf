//! The seam between the socket state machine and the raw transport.
//!
//! A [`Transport`] opens physical connections. Each successful connect
//! yields a [`Connection`]: an outgoing frame channel consumed by the
//! transport's write side, and an ordered stream of [`TransportEvent`]s
//! from its read side. Dropping the outgoing sender tears the
//! connection down.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::TransportError;

/// Outbound unit handed to the transport writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A text frame, already wire-encoded.
    Text(String),
    /// Start a close handshake with the given close code.
    Close(u16),
}

/// Notifications delivered by a live connection, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Message(String),
    /// The connection closed (gracefully or not).
    Closed {
        /// Close code; 1000 is a normal closure.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
    /// A non-fatal transport error. Informational only; a fatal error is
    /// always followed by `Closed`.
    Error(String),
}

/// A live physical connection.
pub struct Connection {
    /// Writer channel consumed by the transport's pump task.
    pub outgoing: mpsc::Sender<Frame>,
    /// Ordered transport notifications.
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens physical connections.
///
/// The production implementation is [`crate::ws::WsTransport`]; tests
/// substitute [`crate::testing::MemoryTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url`, sending `headers` with the handshake.
    async fn connect(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Connection, TransportError>;
}
