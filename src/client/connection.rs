use crate::messaging::{ChannelEvent, MessageRouter};
use crate::types::OutboundFrame;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking the connection manager to start connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    AlreadyConnected,
    /// Another caller's attempt is still connecting
    InFlight,
    /// A new attempt was started under this epoch
    Started(u64),
}

struct ConnectionInner {
    state: ConnectionState,
    /// Bumped for every new physical connection and on disconnect, so events
    /// from an older connection can be told apart and ignored.
    epoch: u64,
    writer: Option<mpsc::UnboundedSender<OutboundFrame>>,
    queue: VecDeque<String>,
}

/// Owns the connection state machine, the writer handle and the outbound
/// queue. Every state change happens under one lock and is broadcast to
/// listeners in the order it happened.
pub struct ConnectionManager {
    inner: Mutex<ConnectionInner>,
    state_tx: watch::Sender<ConnectionState>,
    router: Arc<MessageRouter>,
    max_queue_len: usize,
}

impl ConnectionManager {
    pub fn new(router: Arc<MessageRouter>, max_queue_len: usize) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Mutex::new(ConnectionInner {
                state: ConnectionState::Disconnected,
                epoch: 0,
                writer: None,
                queue: VecDeque::new(),
            }),
            state_tx,
            router,
            max_queue_len,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut ConnectionInner, new_state: ConnectionState) {
        tracing::debug!("Connection state {} -> {}", inner.state, new_state);
        inner.state = new_state;
        self.state_tx.send_replace(new_state);
        self.router.publish(ChannelEvent::StateChange(new_state));
    }

    /// Gets the current connection state
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Checks if currently connected
    pub fn is_connected(&self) -> bool {
        self.lock().state == ConnectionState::Connected
    }

    /// Receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    pub fn queued_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Atomically moves `Disconnected`/`Error` to `Connecting`.
    pub fn begin_connect(&self) -> ConnectAttempt {
        let mut inner = self.lock();
        match inner.state {
            ConnectionState::Connected => ConnectAttempt::AlreadyConnected,
            ConnectionState::Connecting => ConnectAttempt::InFlight,
            ConnectionState::Disconnected | ConnectionState::Error => {
                inner.epoch += 1;
                let epoch = inner.epoch;
                self.transition(&mut inner, ConnectionState::Connecting);
                ConnectAttempt::Started(epoch)
            }
        }
    }

    /// Marks the attempt under `epoch` as open: installs the writer, moves
    /// to `Connected` and drains the queue into the writer in FIFO order.
    /// Returns the number of flushed messages, or `None` if the attempt is
    /// stale.
    pub fn open(&self, epoch: u64, writer: mpsc::UnboundedSender<OutboundFrame>) -> Option<usize> {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state != ConnectionState::Connecting {
            return None;
        }
        self.transition(&mut inner, ConnectionState::Connected);

        let mut flushed = 0;
        while let Some(text) = inner.queue.pop_front() {
            if let Err(mpsc::error::SendError(OutboundFrame::Text(text))) =
                writer.send(OutboundFrame::Text(text))
            {
                inner.queue.push_front(text);
                break;
            }
            flushed += 1;
        }
        inner.writer = Some(writer);
        Some(flushed)
    }

    /// Moves the connection under `epoch` to `Error`.
    pub fn fail(&self, epoch: u64) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch
            || matches!(
                inner.state,
                ConnectionState::Error | ConnectionState::Disconnected
            )
        {
            return false;
        }
        self.transition(&mut inner, ConnectionState::Error);
        true
    }

    /// Moves the connection under `epoch` to `Disconnected` and drops its
    /// writer. Returns false if the close is stale or already applied.
    pub fn close(&self, epoch: u64) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state == ConnectionState::Disconnected {
            return false;
        }
        inner.writer = None;
        self.transition(&mut inner, ConnectionState::Disconnected);
        true
    }

    /// Deliberate close: invalidates the current epoch, hands a close frame
    /// to the writer and moves to `Disconnected`.
    pub fn shutdown(&self, code: u16, reason: &str) {
        let mut inner = self.lock();
        inner.epoch += 1;
        if let Some(writer) = inner.writer.take() {
            let _ = writer.send(OutboundFrame::Close {
                code,
                reason: reason.to_string(),
            });
        }
        if inner.state != ConnectionState::Disconnected {
            self.transition(&mut inner, ConnectionState::Disconnected);
        }
    }

    /// Serializes `data` and transmits it if connected, else queues it.
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> serde_json::Result<()> {
        let text = serde_json::to_string(data)?;
        let mut inner = self.lock();

        let text = match (&inner.state, &inner.writer) {
            (ConnectionState::Connected, Some(writer)) => {
                match writer.send(OutboundFrame::Text(text)) {
                    Ok(()) => return Ok(()),
                    Err(mpsc::error::SendError(OutboundFrame::Text(text))) => text,
                    Err(_) => return Ok(()),
                }
            }
            _ => text,
        };

        if inner.queue.len() >= self.max_queue_len {
            inner.queue.pop_front();
            tracing::warn!(
                "Outbound queue full ({} messages), dropped oldest message",
                self.max_queue_len
            );
        }
        inner.queue.push_back(text);
        tracing::debug!("Queued outbound message ({} pending)", inner.queue.len());
        Ok(())
    }

    /// Sends a frame only if the connection is open; never queues.
    pub fn send_direct(&self, text: String) -> bool {
        let inner = self.lock();
        match (&inner.state, &inner.writer) {
            (ConnectionState::Connected, Some(writer)) => {
                writer.send(OutboundFrame::Text(text)).is_ok()
            }
            _ => false,
        }
    }
}
