use super::{ChannelClient, ClientState, ConnectionManager};
use crate::infrastructure::ReconnectBackoff;
use crate::messaging::MessageRouter;
use crate::types::{
    ChannelError, DEFAULT_CONNECT_TIMEOUT, HEARTBEAT_INTERVAL, MAX_QUEUE_LEN,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY, Result,
};
use crate::websocket::{Connector, WebSocketConnector};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Tuning knobs for [`ChannelClient`]. Durations are in milliseconds;
/// `None` selects the default.
#[derive(Debug, Clone, Default)]
pub struct ChannelClientOptions {
    pub connect_timeout: Option<u64>,
    pub heartbeat_interval: Option<u64>,
    pub reconnect_base_delay: Option<u64>,
    pub reconnect_max_delay: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    /// Outbound messages kept while disconnected; the oldest is dropped
    /// when full.
    pub max_queue_len: Option<usize>,
}

impl ChannelClientOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL))
    }

    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(
            self.reconnect_base_delay.unwrap_or(RECONNECT_BASE_DELAY),
            self.reconnect_max_delay.unwrap_or(RECONNECT_MAX_DELAY),
            self.max_reconnect_attempts.unwrap_or(MAX_RECONNECT_ATTEMPTS),
        )
    }

    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len.unwrap_or(MAX_QUEUE_LEN)
    }

    fn validate(&self) -> Result<()> {
        let non_zero = [
            ("connect_timeout", self.connect_timeout),
            ("heartbeat_interval", self.heartbeat_interval),
            ("reconnect_base_delay", self.reconnect_base_delay),
            ("reconnect_max_delay", self.reconnect_max_delay),
        ];
        for (name, value) in non_zero {
            if value == Some(0) {
                return Err(ChannelError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.max_queue_len == Some(0) {
            return Err(ChannelError::Config(
                "max_queue_len must be non-zero".to_string(),
            ));
        }
        let base = self.reconnect_base_delay.unwrap_or(RECONNECT_BASE_DELAY);
        let max = self.reconnect_max_delay.unwrap_or(RECONNECT_MAX_DELAY);
        if base > max {
            return Err(ChannelError::Config(format!(
                "reconnect_base_delay ({base}ms) exceeds reconnect_max_delay ({max}ms)"
            )));
        }
        Ok(())
    }
}

/// Builder for ChannelClient that handles validation and initialization
pub struct ChannelClientBuilder {
    endpoint: String,
    options: ChannelClientOptions,
    connector: Arc<dyn Connector>,
}

impl ChannelClientBuilder {
    /// Create a new builder. The endpoint must be a `ws://` or `wss://` URL.
    pub fn new(endpoint: impl Into<String>, options: ChannelClientOptions) -> Result<Self> {
        let endpoint = endpoint.into();

        let url = Url::parse(&endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChannelError::Config(format!(
                "unsupported endpoint scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }
        options.validate()?;

        Ok(Self {
            endpoint,
            options,
            connector: Arc::new(WebSocketConnector),
        })
    }

    /// Replace the physical connection provider
    pub fn with_connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Build the client and spawn its dispatcher task. Must be called from
    /// within a Tokio runtime.
    pub fn build(self) -> ChannelClient {
        let router = Arc::new(MessageRouter::spawn());
        let connection = Arc::new(ConnectionManager::new(
            Arc::clone(&router),
            self.options.max_queue_len(),
        ));

        ChannelClient {
            endpoint: self.endpoint,
            backoff: self.options.backoff(),
            options: self.options,
            connector: self.connector,
            connection,
            router,
            state: Arc::new(Mutex::new(ClientState::new())),
        }
    }
}
