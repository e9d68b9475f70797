//! Scripted collaborators for unit tests.

use crate::infrastructure::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
use crate::types::{ChannelError, OutboundFrame, Result};
use crate::websocket::{CloseReason, Connector, FrameSink, Transport, TransportEvent};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What the next `open` call does
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Accept,
    Refuse,
    /// Never completes
    Hang,
    AcceptAfter(Duration),
    RefuseAfter(Duration),
}

#[derive(Default)]
struct MockConnectorInner {
    script: Mutex<VecDeque<MockOutcome>>,
    attempts: Mutex<Vec<Instant>>,
    opened: Mutex<Option<mpsc::UnboundedSender<MockConnection>>>,
}

/// Connector whose opens follow a script; unscripted opens are accepted.
/// Each accepted connection is handed to the test as a [`MockConnection`].
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockConnectorInner>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockConnection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self::default();
        *connector.inner.opened.lock().unwrap() = Some(tx);
        (connector, rx)
    }

    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.inner.script.lock().unwrap().push_back(outcome);
    }

    pub fn attempts(&self) -> usize {
        self.inner.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.inner.attempts.lock().unwrap().clone()
    }

    fn accept(&self) -> Transport {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        if let Some(opened) = self.inner.opened.lock().unwrap().as_ref() {
            let _ = opened.send(MockConnection {
                events: event_tx,
                frames: frame_rx,
            });
        }

        let events = stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed();

        Transport {
            sink: Box::new(MockSink { frames: frame_tx }),
            events,
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, _url: &str) -> Result<Transport> {
        self.inner.attempts.lock().unwrap().push(Instant::now());
        let outcome = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Accept);

        match outcome {
            MockOutcome::Accept => Ok(self.accept()),
            MockOutcome::Refuse => Err(ChannelError::Connection("connection refused".to_string())),
            MockOutcome::Hang => std::future::pending().await,
            MockOutcome::AcceptAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.accept())
            }
            MockOutcome::RefuseAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(ChannelError::Connection("connection refused".to_string()))
            }
        }
    }
}

struct MockSink {
    frames: mpsc::UnboundedSender<OutboundFrame>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.frames
            .send(OutboundFrame::Text(text))
            .map_err(|_| ChannelError::Connection("peer gone".to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        self.frames
            .send(OutboundFrame::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| ChannelError::Connection("peer gone".to_string()))
    }
}

/// Server side of an accepted mock connection
pub struct MockConnection {
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub frames: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl MockConnection {
    pub fn push_text(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Text(text.to_string()));
    }

    pub fn push_error(&self, error: &str) {
        let _ = self.events.send(TransportEvent::Error(error.to_string()));
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::Closed(CloseReason::new(code, reason)));
    }

    /// Frames the client has written so far
    pub fn drain_frames(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

/// Scripted reply of the mock HTTP transport
#[derive(Debug, Clone)]
pub enum MockReply {
    Raw(HttpResponse),
    Network,
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        Self::Raw(HttpResponse {
            status,
            content_type: None,
            body: String::new(),
        })
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Raw(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::Raw(HttpResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: body.to_string(),
        })
    }
}

#[derive(Default)]
struct MockHttpInner {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<(Instant, HttpRequest)>>,
    completed: Mutex<usize>,
}

/// HTTP transport that answers from a script and records every request
#[derive(Clone, Default)]
pub struct MockHttpTransport {
    inner: Arc<MockHttpInner>,
}

impl MockHttpTransport {
    pub fn new(replies: Vec<MockReply>) -> Self {
        let transport = Self::default();
        *transport.inner.replies.lock().unwrap() = replies.into();
        transport
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().unwrap().len()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.inner
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Replies that ran to completion (not cancelled)
    pub fn completed_count(&self) -> usize {
        *self.inner.completed.lock().unwrap()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        self.inner
            .requests
            .lock()
            .unwrap()
            .push((Instant::now(), request));
        let mut reply = self
            .inner
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockReply::Network);

        loop {
            match reply {
                MockReply::Raw(response) => {
                    *self.inner.completed.lock().unwrap() += 1;
                    return Ok(response);
                }
                MockReply::Network => {
                    *self.inner.completed.lock().unwrap() += 1;
                    return Err(TransportFailure::Network("connection refused".to_string()));
                }
                MockReply::Delayed(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
            }
        }
    }
}
