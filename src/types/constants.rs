/// Message type strings understood by the monitor server
pub mod message_types {
    pub const PING: &str = "ping";
}

/// Default connect handshake timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10000;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30000;

/// Default reconnect backoff (milliseconds)
pub const RECONNECT_BASE_DELAY: u64 = 1000;
pub const RECONNECT_MAX_DELAY: u64 = 30000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Max outbound queue length while disconnected
pub const MAX_QUEUE_LEN: usize = 1000;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Close reason sent by `disconnect()`; marks the close as deliberate
pub const DISCONNECT_REASON: &str = "Client disconnect";

/// Default request timeout (milliseconds)
pub const DEFAULT_TIMEOUT: u64 = 10000;

/// Default number of retries for retryable request failures
pub const DEFAULT_RETRIES: u32 = 3;

/// Step of the linear retry delay (milliseconds)
pub const RETRY_DELAY: u64 = 1000;

/// Text response bodies are cut to this many characters
pub const MAX_TEXT_BODY_CHARS: usize = 1000;
pub const TRUNCATION_MARKER: &str = "... [truncated]";
