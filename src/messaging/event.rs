use crate::client::ConnectionState;
use crate::types::InboundMessage;

/// Internal type tag carried by state-change notifications
pub const STATE_CHANGE: &str = "__state_change";

/// What a channel listener receives: either a server message or a
/// connection state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(InboundMessage),
    StateChange(ConnectionState),
}

impl ChannelEvent {
    /// The type discriminator of this event
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(message) => &message.kind,
            Self::StateChange(_) => STATE_CHANGE,
        }
    }

    pub fn as_message(&self) -> Option<&InboundMessage> {
        match self {
            Self::Message(message) => Some(message),
            Self::StateChange(_) => None,
        }
    }

    pub fn as_state(&self) -> Option<ConnectionState> {
        match self {
            Self::StateChange(state) => Some(*state),
            Self::Message(_) => None,
        }
    }
}

impl From<InboundMessage> for ChannelEvent {
    fn from(message: InboundMessage) -> Self {
        Self::Message(message)
    }
}

impl From<ConnectionState> for ChannelEvent {
    fn from(state: ConnectionState) -> Self {
        Self::StateChange(state)
    }
}
