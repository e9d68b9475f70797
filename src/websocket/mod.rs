mod factory;
mod transport;

pub use factory::WebSocketConnector;
pub use transport::{CloseReason, Connector, FrameSink, Transport, TransportEvent};
