// Messaging module - Channel events and listener fan-out
pub mod event;
pub mod router;

pub use event::{ChannelEvent, STATE_CHANGE};
pub use router::{Listener, ListenerId, MessageRouter, Subscription};
