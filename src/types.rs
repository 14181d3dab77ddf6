//! Core identifier and naming types shared across the SDK.

use std::fmt;
use std::str::FromStr;

/// Date and time types for message timestamps.
pub use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque identifier of the chat session whose messages are streamed.
///
/// Guaranteed non-empty: construction validates the input, so operations
/// taking a `SessionId` never observe a blank session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session identifier from a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns a [`Kind::Validation`](crate::error::Kind::Validation) error
    /// if `id` is empty.
    pub fn new<S: Into<String>>(id: S) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::validation("session id must not be empty"));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Name of the pub/sub topic a channel binds to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelTopic(String);

impl ChannelTopic {
    /// Topic carrying one session's chat message inserts, following the
    /// `chat_messages_<sessionId>` convention.
    #[must_use]
    pub fn messages(session: &SessionId) -> Self {
        Self(format!("{}_{session}", crate::CHAT_MESSAGES_TABLE))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row filter registered on a channel for database insert events.
///
/// The transport forwards only inserts matching this filter, so the manager
/// never sees rows belonging to other sessions.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertFilter {
    /// Database schema holding the watched table.
    pub schema: String,
    /// Watched table name.
    pub table: String,
    /// Column filter expression, e.g. `session_id=eq.<sessionId>`.
    pub filter: String,
}

impl InsertFilter {
    /// Filter for `chat_messages` rows belonging to one session.
    #[must_use]
    pub fn chat_messages(session: &SessionId) -> Self {
        Self {
            schema: "public".to_owned(),
            table: crate::CHAT_MESSAGES_TABLE.to_owned(),
            filter: format!("session_id=eq.{session}"),
        }
    }
}
