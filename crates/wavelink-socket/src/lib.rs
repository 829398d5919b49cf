//! # wavelink-socket
//!
//! The transport engine of the wavelink client: owns the physical
//! connection lifecycle, wire-level packet framing, heartbeat emission,
//! stall detection, and the reconnection policy. It knows nothing about
//! application semantics; everything above the `Message` packet payload
//! belongs to `wavelink-stream`.
//!
//! The engine is a small state machine ([`Socket`]) coordinating three
//! independent timers (heartbeat, watchdog, reconnect delay) with an
//! asynchronous message stream. All shared state lives behind a single
//! `parking_lot::Mutex`; delegate callbacks are always invoked with the
//! lock released.

#![deny(unsafe_code)]

pub mod errors;
pub mod session;
pub mod socket;
pub mod testing;
pub mod transport;
pub mod ws;

pub use errors::TransportError;
pub use session::SessionContext;
pub use socket::{ConnectionState, Socket, SocketDelegate};
pub use transport::{Connection, Frame, Transport, TransportEvent};
pub use ws::WsTransport;
