#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// Realtime channel error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum ChannelError {
    /// Opening a channel on the transport failed
    Open(String),
    /// The subscribe handshake was rejected or failed
    Subscription(String),
    /// A broadcast send over the channel failed or the channel was closed
    Send(String),
    /// Error decoding an event payload
    Decode(serde_json::Error),
    /// The stream manager driver is no longer running
    Driver,
    /// Message stream lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(reason) => write!(f, "Failed to open channel: {reason}"),
            Self::Subscription(reason) => write!(f, "Subscription failed: {reason}"),
            Self::Send(reason) => write!(f, "Channel send failed: {reason}"),
            Self::Decode(e) => write!(f, "Failed to decode event payload: {e}"),
            Self::Driver => write!(f, "Stream manager is shut down"),
            Self::Lagged { count } => write!(f, "Message stream lagged, missed {count} messages"),
        }
    }
}

impl StdError for ChannelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<ChannelError> for crate::error::Error {
    fn from(e: ChannelError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::Channel, e)
    }
}
