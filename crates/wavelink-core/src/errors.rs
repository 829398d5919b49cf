//! Wire protocol error type.
//!
//! These errors never reach the embedding application; malformed wire
//! data is logged and dropped by the layer that hits it.

/// Convenience alias for protocol-level results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A frame with no content at all.
    #[error("empty frame")]
    EmptyFrame,

    /// Packet type tag outside `0`..=`5`.
    #[error("unknown packet type tag {tag:?}")]
    UnknownPacketType {
        /// The offending tag character.
        tag: char,
    },

    /// Envelope kind tag that is not `0`, `1` or `X`.
    #[error("unknown envelope kind tag {tag:?}")]
    UnknownEnvelopeKind {
        /// The offending tag character.
        tag: char,
    },

    /// Envelope without the `|` separator after the kind tag.
    #[error("envelope missing '|' separator")]
    MissingSeparator,

    /// Event body without the trailing footer separator.
    #[error("event body missing footer separator")]
    MissingFooter,

    /// Body text that is not valid JSON for the expected shape.
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
}
