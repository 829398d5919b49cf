//! Transport error type.
//!
//! Transport failures never surface to the embedding application; they
//! are logged and absorbed into the reconnection policy.

use thiserror::Error;

/// Errors from opening a physical connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection URL could not be parsed into a request.
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// A handshake header name or value was not representable.
    #[error("invalid handshake header: {0}")]
    InvalidHeader(String),

    /// The WebSocket handshake (TCP/TLS/upgrade) failed.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_display() {
        let err = TransportError::Handshake("connection refused".into());
        assert_eq!(err.to_string(), "handshake failed: connection refused");
    }

    #[test]
    fn invalid_url_display() {
        let err = TransportError::InvalidUrl("no scheme".into());
        assert!(err.to_string().contains("invalid connection URL"));
    }
}
