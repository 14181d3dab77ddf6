//! User-facing notices emitted by the stream manager.
//!
//! The manager never propagates transport failures to callers. Anything the
//! user should know about is published as a [`Notice`] on a side channel, and
//! the embedding UI decides how to render it.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// How a notice should be presented.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Neutral progress information
    Info,
    /// A positive outcome worth surfacing
    Success,
    /// Something went wrong
    Error,
}

/// A user-visible event in the life of the subscription.
///
/// Notices carry fixed presentation copy via [`fmt::Display`]. There is no
/// notice for a successful (re)connection: the state flipping back to
/// connected is the signal.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The channel reported a transport error; reconnection is underway.
    ConnectionError,
    /// A manual reconnect was requested.
    Reconnecting,
    /// Automatic reconnection gave up after exhausting all attempts.
    RetriesExhausted,
}

impl Notice {
    /// The severity the embedding UI should render this notice with.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ConnectionError | Self::RetriesExhausted => Severity::Error,
            Self::Reconnecting => Severity::Info,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionError => {
                write!(f, "Chat connection interrupted. Retrying in the background.")
            }
            Self::Reconnecting => write!(f, "Reconnecting to chat..."),
            Self::RetriesExhausted => {
                write!(f, "Chat connection lost. Please refresh the page.")
            }
        }
    }
}
