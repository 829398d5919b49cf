//! Client configuration types.

use serde::{Deserialize, Serialize};
use wavelink_core::constants::DEFAULT_RECONNECT_DELAY_MS;

/// Configuration for one wavelink stream client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// API version sent in the handshake credential.
    pub api_version: u32,
    /// Delay before a debounced reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8056,
            secure: false,
            api_version: 1,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl StreamConfig {
    /// WebSocket URL for this configuration.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}
