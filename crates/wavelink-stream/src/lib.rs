//! # wavelink-stream
//!
//! The channel multiplexer of the wavelink client: demultiplexes the
//! transport engine's single message stream into event notifications,
//! RPC responses and session-control messages, and exposes the public
//! API the embedding application uses (`connect`, `disconnect`,
//! `bind`, `call`).
//!
//! Subscriptions and pending RPC calls live for the [`Stream`]'s
//! lifetime, across any number of physical reconnects.

#![deny(unsafe_code)]

pub mod stream;

pub use stream::{EventCallback, Stream, StreamDelegate};
