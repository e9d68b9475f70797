// Module declarations
mod builder;
mod connection;
mod core;
mod state;


// Public API exports
pub use builder::{ChannelClientBuilder, ChannelClientOptions};
pub use connection::{ConnectAttempt, ConnectionManager, ConnectionState};
pub use self::core::ChannelClient;
pub use state::ClientState;
