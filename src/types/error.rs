use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur when using the duplex channel client.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid client options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection handshake did not complete in time
    #[error("Timeout error")]
    Timeout,

    /// The attempt was abandoned because the client was disconnected
    #[error("Disconnected")]
    Disconnected,
}

/// Convenience type alias for `Result<T, ChannelError>`.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Failure class of an [`ApiError`], derived from its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiErrorKind {
    /// No network connectivity (status 0).
    Connectivity,
    /// The request exceeded its time budget (status 408).
    Timeout,
    /// Server-side failure (status >= 500).
    Server,
    /// The request itself was rejected (other 4xx).
    Client,
    /// Any other status that is not a success.
    Unexpected,
}

/// Structured failure of a control-plane request.
///
/// `status` is `0` when the server could not be reached, `408` when the
/// client-side timeout fired, and the HTTP status code otherwise.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    pub fn timeout() -> Self {
        Self::new(408, "Request timeout")
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self.status {
            0 => ApiErrorKind::Connectivity,
            408 => ApiErrorKind::Timeout,
            500.. => ApiErrorKind::Server,
            400..=499 => ApiErrorKind::Client,
            _ => ApiErrorKind::Unexpected,
        }
    }

    /// Only lost connectivity and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ApiErrorKind::Connectivity | ApiErrorKind::Server
        )
    }
}
