pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{ApiError, ApiErrorKind, ChannelError, Result};
pub use message::{InboundMessage, OutboundFrame};
