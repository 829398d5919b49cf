//! # wavelink-core
//!
//! Wire protocol types for the wavelink client engine: packet framing,
//! envelope framing, and the JSON bodies carried inside them.
//!
//! The wire format is text-based. Every physical frame is a [`Packet`]
//! (one ASCII digit type tag + payload). A `Message` packet carries an
//! [`Envelope`] (one character kind tag + `|` + body), and the envelope
//! body is JSON specific to the kind.

#![deny(unsafe_code)]

pub mod constants;
pub mod envelope;
pub mod errors;
pub mod packet;
pub mod types;

pub use envelope::{Envelope, EnvelopeKind};
pub use errors::ProtocolError;
pub use packet::{Packet, PacketType};
pub use types::{EventBody, OpenParams, RpcRequest, RpcResponse, SessionIssued};
