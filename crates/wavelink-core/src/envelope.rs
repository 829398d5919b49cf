//! Application-level envelope framing.
//!
//! The payload of every `Message` packet is an envelope: a one-character
//! kind tag, a `|` separator, and a body. The body is JSON, except that
//! event bodies carry one more `|`-delimited footer segment after the
//! JSON which is opaque and discarded.

use crate::errors::ProtocolError;

/// Envelope kind, identified by its tag character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Server-pushed event notification (tag `0`).
    Event,
    /// RPC request/response (tag `1`).
    Rpc,
    /// Session-control message (tag `X`).
    System,
}

impl EnvelopeKind {
    /// The tag character for this kind.
    pub const fn tag(self) -> char {
        match self {
            Self::Event => '0',
            Self::Rpc => '1',
            Self::System => 'X',
        }
    }

    /// Parse a tag character back into a kind.
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '0' => Some(Self::Event),
            '1' => Some(Self::Rpc),
            'X' => Some(Self::System),
            _ => None,
        }
    }
}

/// The unit carried inside a `Message` packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Which sub-protocol the body belongs to.
    pub kind: EnvelopeKind,
    /// Body text (everything after the separator).
    pub body: String,
}

impl Envelope {
    /// Build an RPC envelope around a serialized request body.
    pub fn rpc(body: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Rpc,
            body: body.into(),
        }
    }

    /// Encode as `<tag>|<body>`.
    pub fn encode(&self) -> String {
        format!("{}|{}", self.kind.tag(), self.body)
    }

    /// Decode a `Message` packet payload.
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let mut chars = payload.chars();
        let tag = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let kind =
            EnvelopeKind::from_tag(tag).ok_or(ProtocolError::UnknownEnvelopeKind { tag })?;
        if chars.next() != Some('|') {
            return Err(ProtocolError::MissingSeparator);
        }
        Ok(Self {
            kind,
            body: chars.as_str().to_string(),
        })
    }
}

/// Strip the trailing `|<footer>` segment from an event body.
///
/// The footer is opaque and discarded; what remains is the JSON event
/// body. A body with no footer separator at all is malformed.
pub fn strip_event_footer(body: &str) -> Result<&str, ProtocolError> {
    let idx = body.rfind('|').ok_or(ProtocolError::MissingFooter)?;
    Ok(&body[..idx])
}
