//! Protocol-level constants.

/// Heartbeat frame sent by the client at every ping interval tick.
///
/// This is a pre-framed `Ping` packet (`2` + `ping`); it is sent as-is,
/// never wrapped in a `Message` packet.
pub const HEARTBEAT_FRAME: &str = "2ping";

/// Reply sent immediately when the server sends a `Ping` packet.
pub const PING_REPLY_FRAME: &str = "3probe";

/// WebSocket close code used when the client requests a normal closure.
pub const CLOSE_CODE_NORMAL: u16 = 1000;

/// Close code synthesized locally for abnormal closures (never sent on
/// the wire), e.g. when the watchdog force-closes an unresponsive
/// connection.
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

/// Delay before a single debounced reconnect attempt, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
