use crate::types::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Code and reason carried by a close event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Events produced by an open physical connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Text(String),
    Error(String),
    Closed(CloseReason),
}

/// Write half of a physical connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

/// An open physical connection: a sink for outbound frames and a stream of
/// inbound events. The stream ending without a `Closed` event is treated as
/// an abnormal close.
pub struct Transport {
    pub sink: Box<dyn FrameSink>,
    pub events: BoxStream<'static, TransportEvent>,
}

/// Opens physical connections. `WebSocketConnector` is the production
/// implementation; tests inject scripted ones.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &str) -> Result<Transport>;
}
