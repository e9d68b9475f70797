//! # Monitor Link
//!
//! Resilient network client layer for a monitoring dashboard: a persistent
//! WebSocket channel with automatic reconnection, heartbeat and an outbound
//! queue, plus an HTTP request client with timeouts, structured errors and
//! retry on transient failures.
//!
//! ## Example
//!
//! ```no_run
//! use monitor_link::{
//!     ChannelClient, ChannelClientOptions, RequestClient, RequestClientOptions, RequestOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = ChannelClient::new("ws://localhost:3000/ws", ChannelClientOptions::default())?;
//!     channel.connect().await?;
//!
//!     let api = RequestClient::new(RequestClientOptions {
//!         base_url: "http://localhost:3000/api/".to_string(),
//!         ..Default::default()
//!     })?;
//!     let status = api.get("crawler/status", &RequestOptions::default()).await?;
//!     println!("{:?}", status);
//!
//!     channel.disconnect();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

#[cfg(test)]
mod test_helpers;

pub use client::{ChannelClient, ChannelClientBuilder, ChannelClientOptions, ConnectionState};
pub use infrastructure::{
    HttpTransport, RequestClient, RequestClientOptions, RequestOptions, ResponseBody,
};
pub use messaging::{ChannelEvent, Subscription};
pub use types::{ApiError, ApiErrorKind, ChannelError, InboundMessage};
pub use websocket::{Connector, WebSocketConnector};
