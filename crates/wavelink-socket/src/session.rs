//! Logical session context carried across physical reconnects.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

/// Session id + API version sent as handshake metadata on every
/// (re)connect, so the server can resume or validate the logical
/// session. The session id may be replaced at runtime when the server
/// rotates it; subsequent reconnects use the replacement.
pub struct SessionContext {
    session_id: Mutex<Option<String>>,
    api_version: AtomicU32,
}

impl SessionContext {
    /// Create a context with no session id yet.
    pub fn new(api_version: u32) -> Self {
        Self {
            session_id: Mutex::new(None),
            api_version: AtomicU32::new(api_version),
        }
    }

    /// Replace the session id used on subsequent connects.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        *self.session_id.lock() = Some(session_id.into());
    }

    /// The current session id, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    /// Replace the API version.
    pub fn set_api_version(&self, api_version: u32) {
        self.api_version.store(api_version, Ordering::Relaxed);
    }

    /// The current API version.
    pub fn api_version(&self) -> u32 {
        self.api_version.load(Ordering::Relaxed)
    }

    /// Handshake headers for a connect attempt: a `Cookie` credential
    /// carrying the session id (empty before the first issue) and the
    /// API version.
    pub fn handshake_headers(&self) -> Vec<(String, String)> {
        let session_id = self.session_id().unwrap_or_default();
        let api_version = self.api_version();
        vec![(
            "Cookie".to_string(),
            format!("sessionId={session_id}; apiVersion={api_version}"),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_session_id() {
        let ctx = SessionContext::new(3);
        assert!(ctx.session_id().is_none());
        assert_eq!(ctx.api_version(), 3);
    }

    #[test]
    fn headers_with_empty_session() {
        let ctx = SessionContext::new(1);
        let headers = ctx.handshake_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, "Cookie");
        assert_eq!(headers[0].1, "sessionId=; apiVersion=1");
    }

    #[test]
    fn headers_after_session_issued() {
        let ctx = SessionContext::new(2);
        ctx.set_session_id("s-abc");
        let headers = ctx.handshake_headers();
        assert_eq!(headers[0].1, "sessionId=s-abc; apiVersion=2");
    }

    #[test]
    fn session_id_replaced() {
        let ctx = SessionContext::new(1);
        ctx.set_session_id("first");
        ctx.set_session_id("second");
        assert_eq!(ctx.session_id().as_deref(), Some("second"));
    }

    #[test]
    fn api_version_replaced() {
        let ctx = SessionContext::new(1);
        ctx.set_api_version(7);
        assert_eq!(ctx.api_version(), 7);
    }
}
