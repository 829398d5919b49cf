//! JSON bodies carried inside envelopes and the `Open` packet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handshake parameters received once per physical connection in the
/// `Open` packet. Both values are milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenParams {
    /// Heartbeat emission cadence.
    pub ping_interval: u64,
    /// Watchdog window; one idle window beyond this forces a close.
    pub ping_timeout: u64,
}

/// Outgoing RPC request body (client → server).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Correlation id, monotonically increasing from 1.
    pub id: u64,
    /// Remote method name (e.g. `math.add`).
    #[serde(rename = "m")]
    pub method: String,
    /// Positional or structured parameters, passed through verbatim.
    #[serde(rename = "p")]
    pub params: Value,
}

impl RpcRequest {
    /// Build a request body.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Incoming RPC response body (server → client).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Correlation id of the request this answers.
    pub id: u64,
    /// Ordered result list; may be absent.
    #[serde(rename = "p", default)]
    pub results: Option<Vec<Value>>,
}

/// Incoming event body (server → client), after the footer is stripped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventBody {
    /// Channel name.
    #[serde(rename = "e")]
    pub channel: String,
    /// Ordered parameter list; may be absent.
    #[serde(rename = "p", default)]
    pub params: Option<Vec<Value>>,
}

/// Session-control body: the server rotated the session identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIssued {
    /// The newly issued session id.
    pub session_id: String,
}
