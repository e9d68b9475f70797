use super::{
    ChannelClientBuilder, ChannelClientOptions, ClientState, ConnectAttempt, ConnectionManager,
    ConnectionState,
};
use crate::infrastructure::{HeartbeatManager, ReconnectBackoff, TaskKind};
use crate::messaging::{ChannelEvent, MessageRouter, Subscription};
use crate::types::{
    ChannelError, DISCONNECT_REASON, InboundMessage, OutboundFrame, Result, WS_CLOSE_ABNORMAL,
    WS_CLOSE_NORMAL,
};
use crate::websocket::{CloseReason, Connector, Transport, TransportEvent};
use futures::stream::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

/// Persistent duplex channel to the monitor server.
///
/// `ChannelClient` keeps one WebSocket open, reconnects with capped
/// exponential backoff after unexpected closes, sends a heartbeat while
/// connected, queues outbound messages while disconnected and fans inbound
/// messages out to any number of listeners.
///
/// # Example
///
/// ```no_run
/// use monitor_link::{ChannelClient, ChannelClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChannelClient::new("ws://localhost:3000/ws", ChannelClientOptions::default())?;
///
/// let progress = client.subscribe(|event| {
///     if let Some(message) = event.as_message() {
///         println!("{}: {:?}", message.kind, message.payload);
///     }
/// });
///
/// client.connect().await?;
/// client.send(&serde_json::json!({ "type": "get_status" }))?;
///
/// progress.unsubscribe();
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChannelClient {
    pub(crate) endpoint: String,
    pub(crate) options: ChannelClientOptions,
    pub(crate) backoff: ReconnectBackoff,
    pub(crate) connector: Arc<dyn Connector>,

    // Connection state machine and outbound queue
    pub(crate) connection: Arc<ConnectionManager>,

    // Listener fan-out
    pub(crate) router: Arc<MessageRouter>,

    // Consolidated mutable state
    pub(crate) state: Arc<Mutex<ClientState>>,
}

impl ChannelClient {
    /// Creates a client for `endpoint` using the WebSocket connector.
    ///
    /// No connection is opened until [`connect()`](Self::connect) is called.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UrlParse`] for a malformed endpoint and
    /// [`ChannelError::Config`] for a non-WebSocket scheme or invalid options.
    pub fn new(endpoint: impl Into<String>, options: ChannelClientOptions) -> Result<Self> {
        ChannelClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    pub fn builder(
        endpoint: impl Into<String>,
        options: ChannelClientOptions,
    ) -> Result<ChannelClientBuilder> {
        ChannelClientBuilder::new(endpoint, options)
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the connection.
    ///
    /// Resolves once the connection is open. If an attempt is already in
    /// flight, no second connection is opened; the call waits for that
    /// attempt instead. Returns immediately when already connected.
    ///
    /// Calling `connect` also re-enables automatic reconnection after a
    /// manual [`disconnect()`](Self::disconnect) or after the reconnect
    /// attempts ran out.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails, times out, or the client is
    /// disconnected while connecting.
    pub async fn connect(&self) -> Result<()> {
        self.lock_state().was_manual_disconnect = false;
        self.connect_inner().await
    }

    async fn connect_inner(&self) -> Result<()> {
        let state_rx = self.connection.watch();
        let epoch = match self.connection.begin_connect() {
            ConnectAttempt::AlreadyConnected => return Ok(()),
            ConnectAttempt::InFlight => return Self::wait_for_attempt(state_rx).await,
            ConnectAttempt::Started(epoch) => epoch,
        };

        tracing::info!("Connecting to {}", self.endpoint);
        let opened =
            tokio::time::timeout(self.options.connect_timeout(), self.connector.open(&self.endpoint))
                .await;

        let transport = match opened {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                self.handle_open_failure(epoch, &e);
                return Err(e);
            }
            Err(_) => {
                let e = ChannelError::Timeout;
                self.handle_open_failure(epoch, &e);
                return Err(e);
            }
        };

        self.attach(epoch, transport)
    }

    /// Waits for another caller's in-flight attempt to settle
    async fn wait_for_attempt(mut state_rx: watch::Receiver<ConnectionState>) -> Result<()> {
        loop {
            match *state_rx.borrow_and_update() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Error => {
                    return Err(ChannelError::Connection(
                        "connection attempt failed".to_string(),
                    ));
                }
                ConnectionState::Disconnected => {
                    return Err(ChannelError::Connection(
                        "connection closed before it opened".to_string(),
                    ));
                }
                ConnectionState::Connecting => {}
            }
            if state_rx.changed().await.is_err() {
                return Err(ChannelError::Disconnected);
            }
        }
    }

    /// A failed open behaves like a socket that errors and then closes.
    fn handle_open_failure(&self, epoch: u64, error: &ChannelError) {
        tracing::error!("Connection attempt failed: {}", error);
        self.handle_error(epoch);
        self.handle_close(epoch, CloseReason::new(WS_CLOSE_ABNORMAL, error.to_string()));
    }

    /// Wires an open transport into the client: writer and reader tasks,
    /// the `Connected` transition with its queue flush, and the heartbeat.
    fn attach(&self, epoch: u64, transport: Transport) -> Result<()> {
        let Transport { mut sink, events } = transport;
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<OutboundFrame>();

        let mut state = self.lock_state();
        let Some(flushed) = self.connection.open(epoch, writer_tx) else {
            drop(state);
            tracing::info!("Connection opened after disconnect, closing it");
            tokio::spawn(async move {
                let _ = sink.close(WS_CLOSE_NORMAL, DISCONNECT_REASON).await;
            });
            return Err(ChannelError::Disconnected);
        };

        state.reconnect_attempts = 0;
        state.task_manager.abort(TaskKind::Reconnect);

        state.task_manager.spawn(TaskKind::Writer, async move {
            while let Some(frame) = writer_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        tracing::debug!("Sending frame: {}", text);
                        if let Err(e) = sink.send_text(text).await {
                            tracing::error!("WebSocket write error: {}", e);
                            break;
                        }
                    }
                    OutboundFrame::Close { code, reason } => {
                        if let Err(e) = sink.close(code, &reason).await {
                            tracing::debug!("Close frame not delivered: {}", e);
                        }
                        break;
                    }
                }
            }
            tracing::debug!("Writer task finished");
        });

        let client = self.clone();
        state.task_manager.spawn(TaskKind::Reader, async move {
            tracing::debug!("Starting read task");
            let mut events = events;
            let mut close = None;
            while let Some(event) = events.next().await {
                match event {
                    TransportEvent::Text(text) => client.handle_text(epoch, &text),
                    TransportEvent::Error(e) => {
                        tracing::error!("WebSocket read error: {}", e);
                        client.handle_error(epoch);
                    }
                    TransportEvent::Closed(reason) => {
                        close = Some(reason);
                        break;
                    }
                }
            }
            let reason =
                close.unwrap_or_else(|| CloseReason::new(WS_CLOSE_ABNORMAL, "connection lost"));
            client.handle_close(epoch, reason);
            tracing::debug!("Read task finished");
        });

        let heartbeat = HeartbeatManager::new(Arc::downgrade(&self.connection))
            .with_interval(self.options.heartbeat_interval());
        state.task_manager.spawn(TaskKind::Heartbeat, heartbeat.run());

        if flushed > 0 {
            tracing::debug!("Flushed {} queued messages", flushed);
        }
        tracing::info!("Connected to {}", self.endpoint);
        Ok(())
    }

    fn handle_text(&self, epoch: u64, text: &str) {
        if !self.connection.is_current(epoch) {
            return;
        }
        match InboundMessage::parse(text) {
            Ok(message) => {
                tracing::debug!("Received message: type={}", message.kind);
                self.router.publish(ChannelEvent::Message(message));
            }
            Err(e) => {
                tracing::warn!("Dropping malformed message: {} - Raw: {}", e, text);
            }
        }
    }

    fn handle_error(&self, epoch: u64) {
        let mut state = self.lock_state();
        if self.connection.fail(epoch) {
            state.task_manager.abort(TaskKind::Heartbeat);
        }
    }

    fn handle_close(&self, epoch: u64, reason: CloseReason) {
        let mut state = self.lock_state();
        if !self.connection.close(epoch) {
            return;
        }
        state.task_manager.abort(TaskKind::Heartbeat);
        // The read task may be the caller; let it finish on its own.
        state.task_manager.detach(TaskKind::Reader);

        let deliberate = state.was_manual_disconnect
            || (reason.code == WS_CLOSE_NORMAL && reason.reason == DISCONNECT_REASON);
        if deliberate {
            tracing::info!("Connection closed by client");
            return;
        }

        tracing::warn!(
            "Connection closed: code={}, reason='{}'",
            reason.code,
            reason.reason
        );
        self.schedule_reconnect(&mut state);
    }

    fn schedule_reconnect(&self, state: &mut ClientState) {
        let attempts = state.reconnect_attempts;
        let Some(delay) = self.backoff.next_delay(attempts) else {
            tracing::warn!(
                "Max reconnection attempts ({}) reached, giving up until connect() is called",
                self.backoff.max_attempts()
            );
            return;
        };

        tracing::info!(
            "Reconnecting in {}ms (attempt {}/{})",
            delay.as_millis(),
            attempts + 1,
            self.backoff.max_attempts()
        );

        let client = self.clone();
        state.task_manager.spawn(TaskKind::Reconnect, async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = client.lock_state();
                // Past the timer there is nothing left to cancel, and the
                // attempt below may schedule the next one.
                state.task_manager.detach(TaskKind::Reconnect);
                if state.was_manual_disconnect {
                    return;
                }
                state.reconnect_attempts += 1;
            }
            tracing::info!("Attempting to reconnect...");
            if let Err(e) = client.connect_inner().await {
                tracing::error!("Reconnection attempt failed: {}", e);
            }
        });
    }

    /// Closes the connection deliberately.
    ///
    /// Cancels any pending reconnect and the heartbeat, closes the socket
    /// with code 1000 and moves to `Disconnected`. No automatic reconnect
    /// follows. Queued outbound messages are kept for the next connection.
    pub fn disconnect(&self) {
        let mut state = self.lock_state();
        state.was_manual_disconnect = true;
        state.task_manager.abort(TaskKind::Reconnect);
        state.task_manager.abort(TaskKind::Heartbeat);
        state.task_manager.abort(TaskKind::Reader);

        tracing::info!("Disconnecting from {}", self.endpoint);
        self.connection.shutdown(WS_CLOSE_NORMAL, DISCONNECT_REASON);
    }

    /// Sends `data` as JSON if connected, otherwise queues it until the next
    /// successful connect. Never waits.
    ///
    /// # Errors
    ///
    /// Only fails if `data` cannot be serialized.
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> Result<()> {
        self.connection.send(data)?;
        Ok(())
    }

    /// Registers a listener for every inbound message and state change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.router.subscribe(callback)
    }

    /// Registers a listener that only sees connection state changes.
    pub fn subscribe_to_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.router.subscribe(move |event| {
            if let ChannelEvent::StateChange(state) = event {
                callback(*state);
            }
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Watch channel following the connection state
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch()
    }

    /// Number of outbound messages waiting for a connection
    pub fn queued_len(&self) -> usize {
        self.connection.queued_len()
    }

    /// Reconnect attempts made since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.lock_state().reconnect_attempts
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
