use super::transport::{CloseReason, Connector, FrameSink, Transport, TransportEvent};
use crate::types::{Result, WS_CLOSE_ABNORMAL};
use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Opens WebSocket connections with `tokio-tungstenite`
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &str) -> Result<Transport> {
        tracing::debug!("Creating WebSocket connection to: {}", url);
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write_half, read_half) = ws_stream.split();

        let events = read_half
            .filter_map(|msg_result| async move {
                match msg_result {
                    Ok(Message::Text(text)) => Some(TransportEvent::Text(text.as_str().to_owned())),
                    Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => Some(TransportEvent::Text(text)),
                        Err(_) => {
                            tracing::warn!(
                                "Received non-UTF-8 binary message ({} bytes)",
                                data.len()
                            );
                            None
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        let reason = match frame {
                            Some(close_frame) => CloseReason::new(
                                u16::from(close_frame.code),
                                close_frame.reason.as_str(),
                            ),
                            None => CloseReason::new(WS_CLOSE_ABNORMAL, ""),
                        };
                        Some(TransportEvent::Closed(reason))
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::debug!("Received ping ({} bytes)", data.len());
                        None
                    }
                    Ok(Message::Pong(data)) => {
                        tracing::debug!("Received pong ({} bytes)", data.len());
                        None
                    }
                    Ok(Message::Frame(_)) => None,
                    Err(e) => Some(TransportEvent::Error(e.to_string())),
                }
            })
            .boxed();

        Ok(Transport {
            sink: Box::new(WebSocketSink { writer: write_half }),
            events,
        })
    }
}

struct WebSocketSink {
    writer: WsWriter,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.writer.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.writer.send(Message::Close(Some(frame))).await?;
        self.writer.close().await?;
        Ok(())
    }
}
