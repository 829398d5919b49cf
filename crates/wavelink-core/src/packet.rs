//! Wire-level packet framing.
//!
//! One packet per physical frame: a single ASCII digit type tag
//! immediately followed by the payload text. The payload may be empty
//! (heartbeat acks usually are).

use crate::errors::ProtocolError;

/// Wire-level packet type, identified by its ASCII digit tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    /// Handshake parameters for this physical connection.
    Open,
    /// Server-initiated graceful close.
    Close,
    /// Server liveness probe; answered with a `Pong`.
    Ping,
    /// Heartbeat acknowledgment; informational only.
    Pong,
    /// Application payload (carries an envelope).
    Message,
    /// Reserved; no action at this layer.
    Upgrade,
}

impl PacketType {
    /// The ASCII digit tag for this packet type.
    pub const fn tag(self) -> char {
        match self {
            Self::Open => '0',
            Self::Close => '1',
            Self::Ping => '2',
            Self::Pong => '3',
            Self::Message => '4',
            Self::Upgrade => '5',
        }
    }

    /// Parse a tag character back into a packet type.
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '0' => Some(Self::Open),
            '1' => Some(Self::Close),
            '2' => Some(Self::Ping),
            '3' => Some(Self::Pong),
            '4' => Some(Self::Message),
            '5' => Some(Self::Upgrade),
            _ => None,
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
        };
        write!(f, "{name}")
    }
}

/// A framed wire packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// The packet type.
    pub packet_type: PacketType,
    /// Payload text (everything after the tag).
    pub payload: String,
}

impl Packet {
    /// Build a `Message` packet around an already-encoded envelope.
    pub fn message(payload: impl Into<String>) -> Self {
        Self {
            packet_type: PacketType::Message,
            payload: payload.into(),
        }
    }

    /// Encode as a wire frame: tag digit + payload.
    pub fn encode(&self) -> String {
        format!("{}{}", self.packet_type.tag(), self.payload)
    }

    /// Decode a wire frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let tag = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let packet_type =
            PacketType::from_tag(tag).ok_or(ProtocolError::UnknownPacketType { tag })?;
        Ok(Self {
            packet_type,
            payload: chars.as_str().to_string(),
        })
    }
}
